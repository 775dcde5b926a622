use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Reject course mutations without a valid bearer token.
    pub require_auth: bool,
}
