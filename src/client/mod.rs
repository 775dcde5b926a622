pub mod dto;
pub mod memory;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Course, CourseId, LoginRequest, LoginResponse, NewCourseRequest, RegisterRequest, User};
use crate::session::AuthContext;

pub use dto::{CoursePage, ListParams, SortOrder, TOTAL_COUNT_HEADER};
pub use memory::InMemoryCourseApi;

/// The REST collaborator behind every page of the app.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn list_courses(&self, params: &ListParams) -> Result<CoursePage, AppError>;
    /// Unfiltered, unpaginated read of the whole collection.
    async fn fetch_all_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn fetch_course(&self, id: &CourseId) -> Result<Course, AppError>;
    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError>;
    async fn update_course(&self, id: &CourseId, req: &NewCourseRequest) -> Result<Course, AppError>;
    async fn delete_course(&self, id: &CourseId) -> Result<(), AppError>;
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError>;
    async fn register(&self, req: &RegisterRequest) -> Result<User, AppError>;
}

pub struct HttpCourseApi {
    client: Client,
    base_url: Url,
    auth: AuthContext,
}

impl HttpCourseApi {
    pub fn new(base_url: &str, auth: AuthContext) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::BadRequest(format!("Invalid API url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::BadRequest(format!("Invalid API url {}", base_url)));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::BadRequest(format!("Invalid API url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Every request goes through here so the bearer token is attached
    /// whenever a session exists.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, AppError> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        Ok(match self.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn course_request(&self, method: Method, id: &CourseId) -> Result<RequestBuilder, AppError> {
        let id = id.to_string();
        self.request(method, &["courses", id.as_str()])
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<dto::ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| serde_json::from_str::<String>(&body).ok())
        .unwrap_or(body);
    Err(AppError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn list_courses(&self, params: &ListParams) -> Result<CoursePage, AppError> {
        let response = self
            .request(Method::GET, &["courses"])?
            .query(params)
            .send()
            .await?;
        let response = check_status(response).await?;

        let header_total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let items: Vec<Course> = response.json().await?;
        let total = header_total.unwrap_or(items.len() as u64);

        Ok(CoursePage { items, total })
    }

    async fn fetch_all_courses(&self) -> Result<Vec<Course>, AppError> {
        let response = self.request(Method::GET, &["courses"])?.send().await?;
        Self::json(response).await
    }

    async fn fetch_course(&self, id: &CourseId) -> Result<Course, AppError> {
        let response = self.course_request(Method::GET, id)?.send().await?;
        Self::json(response).await
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        let response = self
            .request(Method::POST, &["courses"])?
            .json(req)
            .send()
            .await?;
        Self::json(response).await
    }

    async fn update_course(&self, id: &CourseId, req: &NewCourseRequest) -> Result<Course, AppError> {
        let response = self
            .course_request(Method::PUT, id)?
            .json(req)
            .send()
            .await?;
        Self::json(response).await
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), AppError> {
        let response = self.course_request(Method::DELETE, id)?.send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError> {
        let response = self.request(Method::POST, &["login"])?.json(req).send().await?;
        Self::json(response).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<User, AppError> {
        let response = self.request(Method::POST, &["register"])?.json(req).send().await?;
        // json-server-auth answers with `{accessToken, user}`, plain
        // backends with the user itself.
        let body: serde_json::Value = Self::json(response).await?;
        let user = match body.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(body)?,
        };
        Ok(user)
    }
}
