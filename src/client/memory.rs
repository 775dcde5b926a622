//! In-process stand-in for the course API with the same query semantics
//! as the HTTP backend. Records every list request so callers can check
//! what would have gone over the wire.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::client::{CourseApi, CoursePage, ListParams, SortOrder};
use crate::error::AppError;
use crate::models::{
    Course, CourseId, LoginRequest, LoginResponse, NewCourseRequest, RegisterRequest, User,
    compare_ids,
};

#[derive(Default)]
struct MemoryState {
    courses: Vec<Course>,
    next_id: i64,
    users: Vec<(User, String)>,
    list_requests: Vec<ListParams>,
    fetch_all_calls: usize,
    failing: bool,
}

#[derive(Default)]
pub struct InMemoryCourseApi {
    state: Mutex<MemoryState>,
}

impl InMemoryCourseApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courses(courses: Vec<Course>) -> Self {
        let next_id = courses
            .iter()
            .filter_map(|c| match c.id {
                CourseId::Number(n) => Some(n),
                CourseId::Text(_) => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(MemoryState {
                courses,
                next_id,
                ..Default::default()
            }),
        }
    }

    /// While set, every call fails with a 503.
    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }

    pub async fn list_requests(&self) -> Vec<ListParams> {
        self.state.lock().await.list_requests.clone()
    }

    pub async fn fetch_all_calls(&self) -> usize {
        self.state.lock().await.fetch_all_calls
    }

    pub async fn courses(&self) -> Vec<Course> {
        self.state.lock().await.courses.clone()
    }
}

fn unavailable() -> AppError {
    AppError::Api {
        status: 503,
        message: "Service unavailable".to_string(),
    }
}

fn matches(course: &Course, params: &ListParams) -> bool {
    if let Some(needle) = &params.name_like {
        if !course.name.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    if let Some(teacher) = &params.teacher {
        if course.teacher.as_deref() != Some(teacher.as_str()) {
            return false;
        }
    }
    true
}

fn sort_courses(courses: &mut [Course], field: &str, order: SortOrder) {
    courses.sort_by(|a, b| match field {
        "name" => a.name.cmp(&b.name),
        "credit" => a.credit.cmp(&b.credit),
        "teacher" => a.teacher.cmp(&b.teacher),
        _ => compare_ids(&a.id, &b.id),
    });
    if order == SortOrder::Desc {
        courses.reverse();
    }
}

#[async_trait]
impl CourseApi for InMemoryCourseApi {
    async fn list_courses(&self, params: &ListParams) -> Result<CoursePage, AppError> {
        let mut state = self.state.lock().await;
        state.list_requests.push(params.clone());
        if state.failing {
            return Err(unavailable());
        }

        let mut filtered: Vec<Course> = state
            .courses
            .iter()
            .filter(|c| matches(c, params))
            .cloned()
            .collect();
        sort_courses(&mut filtered, &params.sort, params.order);

        let total = filtered.len() as u64;
        let skip = (params.page.max(1) as usize - 1) * params.limit as usize;
        let items = filtered
            .into_iter()
            .skip(skip)
            .take(params.limit as usize)
            .collect();
        Ok(CoursePage { items, total })
    }

    async fn fetch_all_courses(&self) -> Result<Vec<Course>, AppError> {
        let mut state = self.state.lock().await;
        state.fetch_all_calls += 1;
        if state.failing {
            return Err(unavailable());
        }
        Ok(state.courses.clone())
    }

    async fn fetch_course(&self, id: &CourseId) -> Result<Course, AppError> {
        let state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        state
            .courses
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        let mut state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        state.next_id += 1;
        let course = req.clone().into_course(CourseId::Number(state.next_id));
        state.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: &CourseId, req: &NewCourseRequest) -> Result<Course, AppError> {
        let mut state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        let slot = state
            .courses
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(AppError::NotFound)?;
        *slot = req.clone().into_course(id.clone());
        Ok(slot.clone())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        let before = state.courses.len();
        state.courses.retain(|c| &c.id != id);
        if state.courses.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError> {
        let state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        let (user, password) = state
            .users
            .iter()
            .find(|(u, _)| u.email == req.email)
            .ok_or_else(|| AppError::Api {
                status: 400,
                message: "Cannot find user".to_string(),
            })?;
        if password != &req.password {
            return Err(AppError::Api {
                status: 400,
                message: "Incorrect password".to_string(),
            });
        }
        Ok(LoginResponse {
            access_token: Uuid::new_v4().to_string(),
            user: user.clone(),
        })
    }

    async fn register(&self, req: &RegisterRequest) -> Result<User, AppError> {
        let mut state = self.state.lock().await;
        if state.failing {
            return Err(unavailable());
        }
        if state.users.iter().any(|(u, _)| u.email == req.email) {
            return Err(AppError::Api {
                status: 400,
                message: "Email already exists".to_string(),
            });
        }
        let user = User {
            id: state.users.len() as i64 + 1,
            email: req.email.clone(),
            username: req.username.clone(),
        };
        state.users.push((user.clone(), req.password.clone()));
        Ok(user)
    }
}
