//! Configuration for the publish engine.

use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for publish operations.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Admin API base URL, always ending in exactly one `/`.
    pub api_url: String,
    /// Per-request timeout handed to the HTTP client.
    pub timeout: Duration,
    /// Whether reconciled metadata is written back to the document.
    pub write_back: bool,
}

impl PublishConfig {
    /// Creates a new publish configuration.
    ///
    /// `api_url` is the Admin API root, e.g.
    /// `https://blog.example/ghost/api/admin/`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_api_url(&api_url.into()),
            timeout: DEFAULT_TIMEOUT,
            write_back: true,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables metadata write-back.
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    /// Returns the public site root (the API URL up to `/ghost/`).
    pub fn site_root(&self) -> &str {
        match self.api_url.find("/ghost/") {
            Some(index) => &self.api_url[..index],
            None => self.api_url.trim_end_matches('/'),
        }
    }

    /// Returns the admin editor URL for a post.
    pub fn editor_url(&self, post_id: &str) -> String {
        format!("{}/ghost/#/editor/post/{}", self.site_root(), post_id)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Converts backslashes and collapses trailing slashes into one.
pub fn normalize_api_url(url: &str) -> String {
    let url = url.trim().replace('\\', "/");
    format!("{}/", url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_config_builder() {
        let config = PublishConfig::new("https://blog.example/ghost/api/admin")
            .with_timeout(Duration::from_secs(5))
            .with_write_back(false);

        assert_eq!(config.api_url, "https://blog.example/ghost/api/admin/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.write_back);
    }

    #[test]
    fn api_url_gets_single_trailing_slash() {
        assert_eq!(
            normalize_api_url("https://blog.example/ghost/api/admin//"),
            "https://blog.example/ghost/api/admin/"
        );
        assert_eq!(
            normalize_api_url("https://blog.example/ghost/api/admin/"),
            "https://blog.example/ghost/api/admin/"
        );
    }

    #[test]
    fn editor_url_uses_site_root() {
        let config = PublishConfig::new("https://blog.example/ghost/api/admin/");
        assert_eq!(config.site_root(), "https://blog.example");
        assert_eq!(
            config.editor_url("64f0c0ffee"),
            "https://blog.example/ghost/#/editor/post/64f0c0ffee"
        );
    }

    #[test]
    fn defaults() {
        let config = PublishConfig::new("https://blog.example/ghost/api/admin/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.write_back);
    }
}
