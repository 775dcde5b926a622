//! json-server compatible course API, so the client can run against a
//! local backend.

pub mod auth;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::info;

use crate::client::{SortOrder, TOTAL_COUNT_HEADER};
use crate::db::repository::{self, CourseFilter, SortColumn};
use crate::error::AppError;
use crate::forms::check_course;
use crate::models::{Course, NewCourseRequest};
use crate::state::AppState;

/// json-server's page size when `_page` comes without `_limit`.
const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
struct CourseQueryParams {
    #[serde(rename = "_page")]
    page: Option<u32>,
    #[serde(rename = "_limit")]
    limit: Option<u32>,
    #[serde(rename = "_sort")]
    sort: Option<String>,
    #[serde(rename = "_order")]
    order: Option<SortOrder>,
    name_like: Option<String>,
    teacher: Option<String>,
}

impl CourseQueryParams {
    fn into_filter(self) -> Result<CourseFilter, AppError> {
        let sort = match self.sort.as_deref() {
            None | Some("") => SortColumn::default(),
            Some(field) => SortColumn::parse(field)
                .ok_or_else(|| AppError::BadRequest(format!("cannot sort by {}", field)))?,
        };
        let paging = match (self.page, self.limit) {
            (None, None) => None,
            (page, limit) => Some((page.unwrap_or(1), limit.unwrap_or(DEFAULT_LIMIT))),
        };
        Ok(CourseFilter {
            name_like: self.name_like.filter(|s| !s.is_empty()),
            teacher: self.teacher.filter(|s| !s.is_empty()),
            sort,
            order: self.order.unwrap_or_default(),
            paging,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

/// Ids are numeric here; anything else cannot exist.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::NotFound)
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.into_filter()?;
    let total = repository::count_courses(&state.db, &filter).await?;
    let courses = repository::fetch_courses(&state.db, &filter).await?;
    Ok(([(TOTAL_COUNT_HEADER, total.to_string())], Json(courses)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = repository::fetch_course(&state.db, parse_id(&id)?)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    auth::authorize(&state, &headers).await?;
    check_course(&req)?;
    let course = repository::insert_course(&state.db, req).await?;
    info!("created course {}", course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    auth::authorize(&state, &headers).await?;
    check_course(&req)?;
    let course = repository::update_course(&state.db, parse_id(&id)?, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth::authorize(&state, &headers).await?;
    if repository::delete_course(&state.db, parse_id(&id)?).await? {
        info!("deleted course {}", id);
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound)
    }
}
