use reqwest::StatusCode;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },
    #[error("application crashed: {0}")]
    AppCrashed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("output stream already reached its end")]
    StreamExhausted,
}

impl ClientError {
    /// HTTP status carried by a failed request, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::RequestFailed { status, .. } => Some(*status),
            ClientError::Network(err) => err.status(),
            _ => None,
        }
    }

    /// Maps a 502 from the platform onto [`ClientError::AppCrashed`], keeping the
    /// response body as the diagnostic text. Everything else passes through.
    pub(crate) fn classify_crash(self) -> Self {
        match self {
            ClientError::RequestFailed { status, body } if status == StatusCode::BAD_GATEWAY => {
                ClientError::AppCrashed(body)
            }
            other => other,
        }
    }
}
