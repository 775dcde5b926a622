use std::sync::Arc;

use tracing::{error, info};

use crate::client::CourseApi;
use crate::controller::notify::Notifier;
use crate::error::AppError;
use crate::forms::{LoginForm, RegisterForm};
use crate::models::User;
use crate::session::{AuthContext, Session};

/// Login, registration and logout against the API, updating the shared
/// [`AuthContext`].
pub struct AuthFlow {
    api: Arc<dyn CourseApi>,
    auth: AuthContext,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn CourseApi>, auth: AuthContext) -> Self {
        Self { api, auth }
    }

    pub async fn login(&self, form: &LoginForm, notifier: &dyn Notifier) -> Result<User, AppError> {
        let req = form.validate()?;
        let response = match self.api.login(&req).await {
            Ok(response) => response,
            Err(e) => {
                error!("login failed for {}: {}", req.email, e);
                notifier.error("Sign in failed");
                return Err(e);
            }
        };

        let user = response.user.clone();
        self.auth.sign_in(Session {
            token: response.access_token,
            user: response.user,
        })?;
        notifier.success("Signed in");
        Ok(user)
    }

    /// Password confirmation is checked locally before anything is sent.
    pub async fn register(&self, form: &RegisterForm, notifier: &dyn Notifier) -> Result<User, AppError> {
        let req = form.validate()?;
        match self.api.register(&req).await {
            Ok(user) => {
                info!("registered {}", user.email);
                notifier.success("Registered successfully");
                Ok(user)
            }
            Err(e) => {
                error!("registration failed: {}", e);
                let message = match &e {
                    AppError::Api { message, .. } if !message.is_empty() => message.clone(),
                    _ => "Registration failed".to_string(),
                };
                notifier.error(&message);
                Err(e)
            }
        }
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.auth.sign_out()
    }
}
