use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use coursedesk::api::router;
use coursedesk::client::{CourseApi, HttpCourseApi, ListParams};
use coursedesk::controller::{
    AuthFlow, CourseEditor, DeleteOutcome, FixedAnswer, ListingController, ListingOptions,
    NoticeLog,
};
use coursedesk::db;
use coursedesk::error::AppError;
use coursedesk::forms::{CourseForm, LoginForm, RegisterForm};
use coursedesk::models::{Category, CourseId, NewCourseRequest};
use coursedesk::session::AuthContext;
use coursedesk::state::AppState;
use serde_json::json;
use tokio::net::TcpListener;

/// Boot the API on an ephemeral port over a fresh in-memory database.
async fn spawn_server(require_auth: bool) -> String {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create database");
    serve_app(router(AppState {
        db: pool,
        require_auth,
    }))
    .await
}

async fn serve_app(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, auth: &AuthContext) -> Arc<HttpCourseApi> {
    Arc::new(HttpCourseApi::new(base_url, auth.clone()).expect("Failed to create client"))
}

fn course_request(name: &str, teacher: &str) -> NewCourseRequest {
    NewCourseRequest {
        name: name.to_string(),
        credit: 3,
        category: Category::Major,
        teacher: Some(teacher.to_string()),
    }
}

async fn sign_up_and_in(api: Arc<HttpCourseApi>, auth: &AuthContext) {
    let flow = AuthFlow::new(api, auth.clone());
    let notices = NoticeLog::new();
    flow.register(
        &RegisterForm {
            username: "janedoe".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
            confirm_password: "correct-horse".to_string(),
        },
        &notices,
    )
    .await
    .expect("register failed");
    flow.login(
        &LoginForm {
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
        },
        &notices,
    )
    .await
    .expect("login failed");
}

#[tokio::test]
async fn added_course_comes_back_with_the_same_fields() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);
    let notices = NoticeLog::new();

    let form = CourseForm {
        name: "Algorithms".to_string(),
        teacher: "Jane".to_string(),
        credit: "3".to_string(),
        category: "Cơ sở".to_string(),
    };
    let created = CourseEditor::new(api.clone())
        .create(&form, &notices)
        .await
        .expect("create failed");

    let listing = ListingController::new(api, ListingOptions::default());
    listing.fetch_page().await;
    let snapshot = listing.snapshot();

    assert_eq!(snapshot.total, 1);
    let course = &snapshot.courses[0];
    assert_eq!(course.id, created.id);
    assert_eq!(course.name, "Algorithms");
    assert_eq!(course.credit, Some(3));
    assert_eq!(course.category, Some(Category::Foundation));
    assert_eq!(course.teacher.as_deref(), Some("Jane"));
}

#[tokio::test]
async fn paging_and_filters_follow_json_server_conventions() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);

    for i in 1..=12 {
        let teacher = if i % 2 == 0 { "Minh" } else { "Jane" };
        let name = if i % 4 == 0 { format!("Algorithms {i}") } else { format!("Networks {i}") };
        api.create_course(&course_request(&name, teacher)).await.unwrap();
    }

    let page = api.list_courses(&ListParams::page(3, 5, "", "")).await.unwrap();
    assert_eq!(page.total, 12);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, CourseId::Number(11));

    let page = api.list_courses(&ListParams::page(1, 5, "algo", "")).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|c| c.name.starts_with("Algorithms")));

    let page = api.list_courses(&ListParams::page(1, 5, "", "Minh")).await.unwrap();
    assert_eq!(page.total, 6);
    assert!(page.items.iter().all(|c| c.teacher.as_deref() == Some("Minh")));

    let page = api.list_courses(&ListParams::page(1, 5, "", "Min")).await.unwrap();
    assert_eq!(page.total, 0);

    let all = api.fetch_all_courses().await.unwrap();
    assert_eq!(all.len(), 12);
}

#[tokio::test]
async fn deleted_course_disappears_after_refresh() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);
    for i in 1..=7 {
        api.create_course(&course_request(&format!("Course {i}"), "Jane")).await.unwrap();
    }

    let listing = ListingController::new(api.clone(), ListingOptions::default());
    listing.mount().await;
    let target = listing.snapshot().courses[2].id.clone();

    let outcome = listing
        .delete_course(&target, &FixedAnswer(true), &NoticeLog::new())
        .await;
    assert_eq!(outcome, DeleteOutcome::Deleted);

    let snapshot = listing.snapshot();
    assert_eq!(snapshot.total, 6);
    assert!(snapshot.courses.iter().all(|c| c.id != target));
    assert!(matches!(api.fetch_course(&target).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn edit_replaces_the_stored_course() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);
    let created = api.create_course(&course_request("Compilers", "Jane")).await.unwrap();
    let editor = CourseEditor::new(api.clone());

    let mut form = editor.load(&created.id).await.unwrap();
    form.category = "Đại cương".to_string();
    form.credit = "4".to_string();
    editor.update(&created.id, &form, &NoticeLog::new()).await.unwrap();

    let stored = api.fetch_course(&created.id).await.unwrap();
    assert_eq!(stored.name, "Compilers");
    assert_eq!(stored.credit, Some(4));
    assert_eq!(stored.category, Some(Category::General));
}

#[tokio::test]
async fn bearer_token_unlocks_mutations_when_required() {
    let base = spawn_server(true).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);

    let err = api
        .create_course(&course_request("Security", "Jane"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Api { status: 401, .. }));

    sign_up_and_in(api.clone(), &auth).await;
    assert!(auth.is_authenticated());

    let created = api.create_course(&course_request("Security", "Jane")).await.unwrap();
    api.delete_course(&created.id).await.unwrap();
}

#[tokio::test]
async fn login_reports_server_messages() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);
    sign_up_and_in(api.clone(), &auth).await;
    let user = auth.user().expect("user stored");
    assert_eq!(user.username, "janedoe");
    assert_eq!(user.email, "jane@example.com");

    let wrong = api
        .login(&coursedesk::models::LoginRequest {
            email: "jane@example.com".to_string(),
            password: "wrong-horse".to_string(),
        })
        .await
        .unwrap_err();
    match wrong {
        AppError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Incorrect password");
        }
        other => panic!("unexpected error: {other}"),
    }

    let duplicate = api
        .register(&coursedesk::models::RegisterRequest {
            username: "janedoe".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(duplicate.user_message(), "Email already exists");
}

#[tokio::test]
async fn invalid_course_is_rejected_by_the_server() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);

    let mut req = course_request("OS", "Jane");
    req.credit = 0;
    let err = api.create_course(&req).await.unwrap_err();

    assert!(matches!(err, AppError::Api { status: 400, .. }));
    assert_eq!(api.fetch_all_courses().await.unwrap().len(), 0);
}

#[tokio::test]
async fn ids_are_sent_as_a_single_path_segment() {
    let base = spawn_server(false).await;
    let auth = AuthContext::new();
    let api = client(&base, &auth);
    api.create_course(&course_request("Course 1", "Jane")).await.unwrap();
    api.create_course(&course_request("Course 2", "Jane")).await.unwrap();

    let err = api.delete_course(&CourseId::Text("1?x".to_string())).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = api.delete_course(&CourseId::Text("2/1".to_string())).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = api.fetch_course(&CourseId::Text("1#x".to_string())).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let remaining: Vec<CourseId> = api
        .fetch_all_courses()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(remaining, vec![CourseId::Number(1), CourseId::Number(2)]);
}

/// A backend without `x-total-count` that answers `/register` in the
/// json-server-auth shape.
async fn spawn_plain_backend() -> String {
    let app = Router::new()
        .route(
            "/courses",
            get(|| async {
                Json(json!([
                    {"id": 1, "name": "Algorithms", "credit": 3, "category": "Cơ sở", "teacher": "Jane"},
                    {"id": "b7", "name": "Seminar"}
                ]))
            }),
        )
        .route(
            "/register",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "accessToken": "token-abc",
                        "user": {"id": 9, "email": "jane@example.com", "username": "janedoe"}
                    })),
                )
            }),
        );
    serve_app(app).await
}

#[tokio::test]
async fn missing_total_header_falls_back_to_page_length() {
    let base = spawn_plain_backend().await;
    let api = client(&base, &AuthContext::new());

    let page = api.list_courses(&ListParams::page(1, 5, "", "")).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 2);
    assert_eq!(page.items[1].id, CourseId::Text("b7".to_string()));
}

#[tokio::test]
async fn register_accepts_token_and_user_response() {
    let base = spawn_plain_backend().await;
    let api = client(&base, &AuthContext::new());

    let user = api
        .register(&coursedesk::models::RegisterRequest {
            username: "janedoe".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(user.id, 9);
    assert_eq!(user.username, "janedoe");
    assert_eq!(user.email, "jane@example.com");
}
