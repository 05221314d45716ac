use crate::error::ApiError;

/// Backend used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable holding the backend base URL
pub const API_URL_ENV: &str = "STUDYHALL_API_URL";

/// Connection settings for [`crate::ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Print request/response diagnostics to the console
    pub verbose: bool,
    /// Write each ask request to the logs directory
    pub log_requests: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            verbose: false,
            log_requests: false,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            ..Self::default()
        })
    }
}

/// Validate a base URL and strip trailing slashes so paths can be appended
pub fn normalize_base_url(url: &str) -> Result<String, ApiError> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| ApiError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slashes() {
        assert_eq!(normalize_base_url("http://localhost:8000/").unwrap(), "http://localhost:8000");
        assert_eq!(normalize_base_url(" https://api.example.com/v1// ").unwrap(), "https://api.example.com/v1");
    }

    #[test]
    fn test_normalize_rejects_bad_urls() {
        assert!(normalize_base_url("localhost:8000").is_err());
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }
}
