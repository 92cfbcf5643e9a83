//! Client configuration

use std::time::Duration;

/// Default remote list name
pub const DEFAULT_LIST_TITLE: &str = "VacationRequests";

/// Configuration for the resilient record store and its collaborators
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | REMOTE_BASE_URL | *(unset)* | Site URL of the remote record service |
/// | REMOTE_TOKEN | *(unset)* | Bearer token for the remote service |
/// | LIST_TITLE | VacationRequests | Remote list name |
/// | REQUEST_TIMEOUT_MS | 30000 | Transport timeout (milliseconds) |
/// | MIRROR_PATH | ./work_dir/mirror.redb | Local mirror database file |
/// | MIRROR_SEED_DEMO | true | Seed demo records into an empty mirror |
/// | DEFAULT_PAGE_SIZE | 50 | Page size when the caller supplies none |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | JSON log output |
/// | LOG_DIR | *(unset)* | Directory for rolling log files |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote site URL; `None` runs against the in-memory service
    pub remote_base_url: Option<String>,
    /// Bearer token for the remote service
    pub remote_token: Option<String>,
    /// Remote list holding the requests
    pub list_title: String,
    /// Transport timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Mirror database file
    pub mirror_path: String,
    /// Seed demo records when the mirror is empty
    pub mirror_seed_demo: bool,
    /// Page size used by callers that pass none
    pub default_page_size: i32,
    /// Log level
    pub log_level: String,
    /// JSON log output
    pub log_json: bool,
    /// Rolling log directory
    pub log_dir: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            remote_base_url: std::env::var("REMOTE_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            remote_token: std::env::var("REMOTE_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            list_title: std::env::var("LIST_TITLE").unwrap_or_else(|_| DEFAULT_LIST_TITLE.into()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30000),
            mirror_path: std::env::var("MIRROR_PATH")
                .unwrap_or_else(|_| "./work_dir/mirror.redb".into()),
            mirror_seed_demo: std::env::var("MIRROR_SEED_DEMO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            default_page_size: std::env::var("DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    pub fn with_remote(mut self, base_url: impl Into<String>) -> Self {
        self.remote_base_url = Some(base_url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.remote_token = Some(token.into());
        self
    }

    pub fn with_list_title(mut self, list_title: impl Into<String>) -> Self {
        self.list_title = list_title.into();
        self
    }

    pub fn with_mirror_path(mut self, path: impl Into<String>) -> Self {
        self.mirror_path = path.into();
        self
    }

    pub fn with_seed_demo(mut self, seed: bool) -> Self {
        self.mirror_seed_demo = seed;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Site URL without trailing slash
    pub fn base_url(&self) -> Option<&str> {
        self.remote_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_env()
            .with_remote("https://contoso.example.com/sites/hr/")
            .with_list_title("TimeOff")
            .with_seed_demo(false)
            .with_timeout_ms(1500);

        assert_eq!(config.base_url(), Some("https://contoso.example.com/sites/hr"));
        assert_eq!(config.list_title, "TimeOff");
        assert!(!config.mirror_seed_demo);
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
    }
}
