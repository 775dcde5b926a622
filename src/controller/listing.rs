//! State behind the course list: search box, teacher filter, pager and
//! the page of results currently shown.
//!
//! Every change to the effective query (debounced search, teacher filter,
//! page or refresh counter) triggers exactly one fetch. Fetches may
//! overlap; each one takes a sequence number and only the most recently
//! issued fetch is allowed to commit its result or clear the loading flag.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::client::{CourseApi, ListParams};
use crate::controller::debounce::Debouncer;
use crate::controller::notify::{Confirm, Notifier};
use crate::controller::pagination::{PAGE_SIZE, clamp_page, total_pages};
use crate::models::{Course, CourseId, sort_by_id};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
pub struct ListingOptions {
    pub page_size: u32,
    pub debounce: Duration,
    /// Re-sort each page by id on the client. The server already sorts by
    /// id, so this is off unless a backend ignores `_sort`.
    pub client_resort: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            debounce: SEARCH_DEBOUNCE,
            client_resort: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    /// What the user typed, shown as-is.
    pub search: String,
    /// Trimmed copy of `search`, trailing it by the debounce delay.
    pub debounced_search: String,
    pub teacher: String,
    pub refresh: u64,
}

impl ListQuery {
    fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            search: String::new(),
            debounced_search: String::new(),
            teacher: String::new(),
            refresh: 0,
        }
    }

    /// The fields whose change triggers a fetch.
    fn trigger(&self) -> (&str, &str, u32, u64) {
        (&self.debounced_search, &self.teacher, self.page, self.refresh)
    }

    pub fn params(&self) -> ListParams {
        ListParams::page(self.page, self.page_size, &self.debounced_search, &self.teacher)
    }
}

/// Render state published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSnapshot {
    pub courses: Vec<Course>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub loading: bool,
    pub search: String,
    pub debounced_search: String,
    pub teacher_filter: String,
    pub teachers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Failed,
}

struct ListingState {
    query: ListQuery,
    courses: Vec<Course>,
    total: u64,
    loading: bool,
    teachers: Vec<String>,
    latest_request: u64,
}

impl ListingState {
    fn snapshot(&self) -> ListingSnapshot {
        ListingSnapshot {
            courses: self.courses.clone(),
            total: self.total,
            page: self.query.page,
            page_size: self.query.page_size,
            total_pages: total_pages(self.total, self.query.page_size),
            loading: self.loading,
            search: self.query.search.clone(),
            debounced_search: self.query.debounced_search.clone(),
            teacher_filter: self.query.teacher.clone(),
            teachers: self.teachers.clone(),
        }
    }
}

struct Inner {
    api: Arc<dyn CourseApi>,
    options: ListingOptions,
    state: Mutex<ListingState>,
    debouncer: Debouncer,
    next_request: AtomicU64,
    render: watch::Sender<ListingSnapshot>,
}

#[derive(Clone)]
pub struct ListingController {
    inner: Arc<Inner>,
}

impl ListingController {
    pub fn new(api: Arc<dyn CourseApi>, options: ListingOptions) -> Self {
        let state = ListingState {
            query: ListQuery::new(options.page_size.max(1)),
            courses: Vec::new(),
            total: 0,
            loading: false,
            teachers: Vec::new(),
            latest_request: 0,
        };
        let (render, _rx) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Inner {
                api,
                options,
                state: Mutex::new(state),
                debouncer: Debouncer::new(options.debounce),
                next_request: AtomicU64::new(0),
                render,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListingState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self) {
        let snapshot = self.state().snapshot();
        self.inner.render.send_replace(snapshot);
    }

    pub fn snapshot(&self) -> ListingSnapshot {
        self.state().snapshot()
    }

    pub fn query(&self) -> ListQuery {
        self.state().query.clone()
    }

    /// Receiver that wakes on every render-state change.
    pub fn subscribe(&self) -> watch::Receiver<ListingSnapshot> {
        self.inner.render.subscribe()
    }

    /// Set filters before the first fetch, bypassing the debounce. Used
    /// when the filters are known up front (command line).
    pub fn preset(&self, search: &str, teacher: &str) {
        {
            let mut state = self.state();
            state.query.search = search.to_string();
            state.query.debounced_search = search.trim().to_string();
            state.query.teacher = teacher.to_string();
            state.query.page = 1;
        }
        self.publish();
    }

    /// Initial load: the teacher list and the first page.
    pub async fn mount(&self) {
        tokio::join!(self.fetch_teachers(), self.fetch_page());
    }

    /// Store the raw text right away and (re)schedule the debounced update.
    pub fn update_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state().query.search = text.clone();
        self.publish();

        let this = self.clone();
        self.inner.debouncer.schedule(async move {
            this.apply_debounced_search(&text).await;
        });
    }

    /// What the debounce timer runs: commit the trimmed text and go back to
    /// page 1.
    pub async fn apply_debounced_search(&self, text: &str) {
        let trimmed = text.trim().to_string();
        debug!("debounced search: {:?}", trimmed);
        self.commit(|q| {
            q.debounced_search = trimmed;
            q.page = 1;
        })
        .await;
    }

    pub async fn update_teacher_filter(&self, teacher: impl Into<String>) {
        let teacher = teacher.into();
        self.commit(|q| {
            q.teacher = teacher;
            q.page = 1;
        })
        .await;
    }

    /// Move to `page`, clamped into the pages known from the last total.
    pub async fn set_page(&self, page: u32) {
        let total = self.state().total;
        self.commit(|q| q.page = clamp_page(page, total, q.page_size)).await;
    }

    pub async fn next_page(&self) {
        let page = self.state().query.page.saturating_add(1);
        self.set_page(page).await;
    }

    pub async fn prev_page(&self) {
        let page = self.state().query.page.saturating_sub(1);
        self.set_page(page).await;
    }

    /// Force a reload without touching the filters.
    pub async fn request_refresh(&self) {
        self.commit(|q| q.refresh += 1).await;
    }

    /// Apply `change` to the query; fetch when the triggering fields moved.
    async fn commit(&self, change: impl FnOnce(&mut ListQuery)) {
        let changed = {
            let mut state = self.state();
            let before = state.query.clone();
            change(&mut state.query);
            before.trigger() != state.query.trigger()
        };
        self.publish();
        if changed {
            self.fetch_page().await;
        }
    }

    /// Distinct, non-empty teacher names from one unpaginated read of the
    /// whole collection, in first-seen order. Failures are only logged.
    pub async fn fetch_teachers(&self) -> Vec<String> {
        match self.inner.api.fetch_all_courses().await {
            Ok(courses) => {
                let teachers = distinct_teachers(&courses);
                self.state().teachers = teachers.clone();
                self.publish();
                teachers
            }
            Err(e) => {
                error!("failed to load teachers: {}", e);
                self.state().teachers.clone()
            }
        }
    }

    /// Fetch the page described by the current query. On failure the
    /// previous page stays in place; the loading flag is cleared either way
    /// unless a newer fetch has been issued meanwhile. When the new total
    /// leaves the current page out of range, the page is clamped and
    /// fetched again.
    pub async fn fetch_page(&self) {
        loop {
            let request = self.inner.next_request.fetch_add(1, Ordering::SeqCst) + 1;
            let params = {
                let mut state = self.state();
                state.latest_request = request;
                state.loading = true;
                state.query.params()
            };
            self.publish();
            debug!(request, ?params, "fetching courses");

            let result = self.inner.api.list_courses(&params).await;

            let refetch = {
                let mut state = self.state();
                if state.latest_request != request {
                    debug!(request, latest = state.latest_request, "discarding stale course page");
                    return;
                }
                let mut refetch = false;
                match result {
                    Ok(mut page) => {
                        if self.inner.options.client_resort {
                            sort_by_id(&mut page.items);
                        }
                        state.courses = page.items;
                        state.total = page.total;
                        let clamped = clamp_page(state.query.page, state.total, state.query.page_size);
                        if clamped != state.query.page {
                            debug!(from = state.query.page, to = clamped, "page out of range, clamping");
                            state.query.page = clamped;
                            refetch = true;
                        }
                    }
                    Err(e) => error!("failed to load courses: {}", e),
                }
                if !refetch {
                    state.loading = false;
                }
                refetch
            };
            self.publish();
            if !refetch {
                break;
            }
        }
    }

    /// Ask first; on yes delete the course and reload the current page.
    pub async fn delete_course(
        &self,
        id: &CourseId,
        confirm: &dyn Confirm,
        notifier: &dyn Notifier,
    ) -> DeleteOutcome {
        if !confirm.confirm(&format!("Delete course {}?", id)) {
            debug!("delete of course {} declined", id);
            return DeleteOutcome::Declined;
        }

        match self.inner.api.delete_course(id).await {
            Ok(()) => {
                info!("deleted course {}", id);
                notifier.success("Course deleted");
                self.request_refresh().await;
                DeleteOutcome::Deleted
            }
            Err(e) => {
                error!("failed to delete course {}: {}", id, e);
                notifier.error("Failed to delete course");
                DeleteOutcome::Failed
            }
        }
    }
}

fn distinct_teachers(courses: &[Course]) -> Vec<String> {
    let mut seen = HashSet::new();
    courses
        .iter()
        .filter_map(|c| c.teacher.as_deref())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn course(id: i64, teacher: Option<&str>) -> Course {
        Course {
            id: CourseId::Number(id),
            name: format!("Course {id}"),
            credit: Some(3),
            category: Some(Category::Major),
            teacher: teacher.map(str::to_string),
        }
    }

    #[test]
    fn teachers_are_distinct_in_first_seen_order() {
        let courses = vec![
            course(1, Some("Minh")),
            course(2, None),
            course(3, Some("Jane")),
            course(4, Some("")),
            course(5, Some("Minh")),
        ];
        assert_eq!(distinct_teachers(&courses), vec!["Minh", "Jane"]);
    }

    #[test]
    fn query_params_follow_debounced_text() {
        let mut query = ListQuery::new(5);
        query.search = "  alg".to_string();
        query.page = 2;
        let params = query.params();
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, 5);
        assert_eq!(params.name_like, None);
        assert_eq!(params.sort, "id");
    }
}
