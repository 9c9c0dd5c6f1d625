use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("not logged in; run `menager-agent login` first")]
    MissingSession,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no geocoding result for `{0}`")]
    NoGeocodeResult(String),
    #[error("{0}")]
    Validation(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("audio playback failed: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
