use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the remote course API.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ApiConfig {
    /// Reads `COURSES_API_URL`, `COURSES_API_TOKEN` and
    /// `COURSES_API_TIMEOUT_SECS`. Unset or unparsable values fall back to the
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("COURSES_API_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());
        let token = lookup("COURSES_API_TOKEN").filter(|t| !t.trim().is_empty());
        let timeout = lookup("COURSES_API_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            base_url: normalize_base_url(&base_url),
            token,
            timeout: Duration::from_secs(timeout),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Absolute URL for an API path such as `courses/my/enrolled`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = ApiConfig::from_lookup(|key| match key {
            "COURSES_API_URL" => Some("https://courses.example.com/v2/".into()),
            "COURSES_API_TOKEN" => Some("  ".into()),
            "COURSES_API_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://courses.example.com/v2");
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn endpoint_keeps_api_prefix() {
        let config = ApiConfig::default();
        assert_eq!(
            config.endpoint("/courses/my/enrolled"),
            "http://localhost:5000/api/courses/my/enrolled"
        );
    }
}
