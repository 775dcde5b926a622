//! Controllers: the state behind each page, driven by user actions and
//! backed by a [`CourseApi`](crate::client::CourseApi).

pub mod auth;
pub mod course_form;
pub mod debounce;
pub mod listing;
pub mod notify;
pub mod pagination;

pub use auth::AuthFlow;
pub use course_form::CourseEditor;
pub use debounce::Debouncer;
pub use listing::{DeleteOutcome, ListQuery, ListingController, ListingOptions, ListingSnapshot};
pub use notify::{Confirm, ConsoleNotifier, FixedAnswer, Notice, NoticeLog, Notifier, StdinConfirm};
pub use pagination::{PAGE_SIZE, clamp_page, total_pages};
