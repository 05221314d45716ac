use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to get response: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
