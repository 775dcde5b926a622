use std::sync::Arc;

use tracing::{error, info};

use crate::client::CourseApi;
use crate::controller::notify::Notifier;
use crate::error::AppError;
use crate::forms::CourseForm;
use crate::models::{Course, CourseId};

/// Submits the add and edit forms.
///
/// Validation failures come back as [`AppError::Validation`] without a
/// request or notification, so the caller can show them next to the
/// fields. API failures are announced through the notifier and returned.
pub struct CourseEditor {
    api: Arc<dyn CourseApi>,
}

impl CourseEditor {
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    /// Prefill the edit form from the stored course.
    pub async fn load(&self, id: &CourseId) -> Result<CourseForm, AppError> {
        let course = self.api.fetch_course(id).await?;
        Ok(CourseForm {
            name: course.name,
            teacher: course.teacher.unwrap_or_default(),
            credit: course.credit.map(|c| c.to_string()).unwrap_or_default(),
            category: course.category.unwrap_or_default().to_string(),
        })
    }

    pub async fn create(&self, form: &CourseForm, notifier: &dyn Notifier) -> Result<Course, AppError> {
        let req = form.validate()?;
        match self.api.create_course(&req).await {
            Ok(course) => {
                info!("created course {} ({})", course.id, course.name);
                notifier.success("Course added");
                Ok(course)
            }
            Err(e) => {
                error!("failed to create course: {}", e);
                notifier.error("Failed to add course");
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        id: &CourseId,
        form: &CourseForm,
        notifier: &dyn Notifier,
    ) -> Result<Course, AppError> {
        let req = form.validate()?;
        match self.api.update_course(id, &req).await {
            Ok(course) => {
                info!("updated course {}", course.id);
                notifier.success("Course updated");
                Ok(course)
            }
            Err(e) => {
                error!("failed to update course {}: {}", id, e);
                notifier.error("Failed to update course");
                Err(e)
            }
        }
    }
}
