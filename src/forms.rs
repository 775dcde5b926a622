//! Field-level validation for the course, login and register forms.
//!
//! Forms hold raw input text; `validate` either yields the request body to
//! send or the per-field messages that block submission.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Category, LoginRequest, NewCourseRequest, RegisterRequest};

pub const MIN_NAME_LEN: usize = 4;
pub const MIN_TEACHER_LEN: usize = 4;
pub const MIN_USERNAME_LEN: usize = 5;
pub const MIN_PASSWORD_LEN: usize = 7;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\S+@\S+$").expect("email pattern is valid"));

/// Validation messages keyed by field, in the order fields were checked.
/// Only the first message per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(field, msg)| format!("{field}: {msg}")).collect();
        f.write_str(&parts.join("; "))
    }
}

fn require_min_len(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    required: &str,
    too_short: &str,
) {
    if value.trim().is_empty() {
        errors.add(field, required);
    } else if value.chars().count() < min {
        errors.add(field, too_short);
    }
}

/// Add/edit course form.
#[derive(Debug, Clone, Default)]
pub struct CourseForm {
    pub name: String,
    pub teacher: String,
    pub credit: String,
    pub category: String,
}

impl CourseForm {
    pub fn new() -> Self {
        Self {
            category: Category::default().to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<NewCourseRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        require_min_len(
            &mut errors,
            "name",
            &self.name,
            MIN_NAME_LEN,
            "Name is required",
            "Name must be at least 4 characters",
        );
        require_min_len(
            &mut errors,
            "teacher",
            &self.teacher,
            MIN_TEACHER_LEN,
            "Teacher is required",
            "Teacher must be at least 4 characters",
        );

        let mut credit = 0;
        if self.credit.trim().is_empty() {
            errors.add("credit", "Credit is required");
        } else {
            match self.credit.trim().parse::<i64>() {
                Ok(n) if n >= 1 => credit = u32::try_from(n).unwrap_or(u32::MAX),
                Ok(_) => errors.add("credit", "Credit must be greater than 0"),
                Err(_) => errors.add("credit", "Credit must be a whole number"),
            }
        }

        let mut category = Category::default();
        if self.category.trim().is_empty() {
            errors.add("category", "Category is required");
        } else {
            match self.category.parse::<Category>() {
                Ok(c) => category = c,
                Err(_) => errors.add("category", "Category must be one of Chuyên ngành, Cơ sở, Đại cương"),
            }
        }

        errors.into_result(|| NewCourseRequest {
            name: self.name.clone(),
            credit,
            category,
            teacher: Some(self.teacher.clone()),
        })
    }
}

/// Invariants every stored course must hold, whatever client sent it.
pub fn check_course(req: &NewCourseRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if req.name.trim().is_empty() {
        errors.add("name", "Name is required");
    } else if req.name.chars().count() < MIN_NAME_LEN {
        errors.add("name", "Name must be at least 4 characters");
    }
    if req.credit < 1 {
        errors.add("credit", "Credit must be greater than 0");
    }
    errors.into_result(|| ())
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result(|| LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        require_min_len(
            &mut errors,
            "username",
            &self.username,
            MIN_USERNAME_LEN,
            "Username is required",
            "Username must be longer than 4 characters",
        );

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !EMAIL_PATTERN.is_match(&self.email) {
            errors.add("email", "Invalid email");
        }

        require_min_len(
            &mut errors,
            "password",
            &self.password,
            MIN_PASSWORD_LEN,
            "Password is required",
            "Password must be longer than 6 characters",
        );

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "Confirm password is required");
        } else if errors.is_empty() && self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }

        errors.into_result(|| RegisterRequest {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_form(name: &str, teacher: &str, credit: &str, category: &str) -> CourseForm {
        CourseForm {
            name: name.to_string(),
            teacher: teacher.to_string(),
            credit: credit.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn valid_course_form_builds_request() {
        let req = course_form("Algorithms", "Jane Doe", "3", "Cơ sở").validate().unwrap();
        assert_eq!(req.name, "Algorithms");
        assert_eq!(req.credit, 3);
        assert_eq!(req.category, Category::Foundation);
        assert_eq!(req.teacher.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn course_form_reports_each_field() {
        let errors = course_form("ABC", "", "0", "Elective").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name must be at least 4 characters"));
        assert_eq!(errors.get("teacher"), Some("Teacher is required"));
        assert_eq!(errors.get("credit"), Some("Credit must be greater than 0"));
        assert!(errors.get("category").is_some());
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn new_course_form_defaults_category() {
        assert_eq!(CourseForm::new().category, "Chuyên ngành");
    }

    #[test]
    fn stored_courses_need_name_and_credit() {
        let req = NewCourseRequest {
            name: "OS".to_string(),
            credit: 0,
            category: Category::General,
            teacher: None,
        };
        let errors = check_course(&req).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn login_form_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn register_form_checks_pattern_and_lengths() {
        let form = RegisterForm {
            username: "bob".to_string(),
            email: "not an email".to_string(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("username"), Some("Username must be longer than 4 characters"));
        assert_eq!(errors.get("email"), Some("Invalid email"));
        assert_eq!(errors.get("password"), Some("Password must be longer than 6 characters"));
        assert_eq!(errors.get("confirm_password"), None);
    }

    #[test]
    fn register_form_rejects_mismatched_confirmation() {
        let form = RegisterForm {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            confirm_password: "s3cret-pasS".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
        assert_eq!(errors.len(), 1);
    }
}
