use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_SESSION_FILE: &str = ".coursedesk-session.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://coursedesk.db?mode=rwc";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub session_file: PathBuf,
    pub database_url: String,
    pub bind: String,
    pub require_auth: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            require_auth: false,
        }
    }
}

impl Settings {
    /// Defaults overridden by the environment (after `.env` is loaded).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        if let Some(v) = lookup("COURSEDESK_API_URL") {
            settings.api_url = v;
        }
        if let Some(v) = lookup("COURSEDESK_SESSION_FILE") {
            settings.session_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("DATABASE_URL") {
            settings.database_url = v;
        }
        if let Some(v) = lookup("COURSEDESK_BIND") {
            settings.bind = v;
        }
        if let Some(v) = lookup("COURSEDESK_REQUIRE_AUTH") {
            settings.require_auth = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_url, "http://localhost:3000");
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COURSEDESK_API_URL", "http://api.test:8080"),
            ("COURSEDESK_REQUIRE_AUTH", "true"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]);
        let settings = Settings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_url, "http://api.test:8080");
        assert!(settings.require_auth);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.bind, DEFAULT_BIND);
    }
}
