pub mod course;
pub mod user;

pub use course::{Category, Course, CourseId, NewCourseRequest, compare_ids, sort_by_id};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, User};
