//! Backend error types.

use reqwest::StatusCode;

/// Errors returned by the resource and upload clients.
#[derive(Debug)]
pub enum ApiError {
    /// The resource does not exist (HTTP 404)
    NotFound,
    /// The backend rejected the payload (HTTP 400 / 422)
    ValidationRejected(String),
    /// The request never got a response
    Network(String),
    /// Any other non-success status
    Unexpected { status: u16, body: String },
    /// The response body could not be decoded
    Decode(String),
}

impl ApiError {
    /// Maps a non-success status and its body to an error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::ValidationRejected(body)
            }
            _ => ApiError::Unexpected {
                status: status.as_u16(),
                body,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::ValidationRejected(body) if body.is_empty() => {
                write!(f, "Rejected by server")
            }
            ApiError::ValidationRejected(body) => write!(f, "Rejected by server: {}", body),
            ApiError::Network(e) => write!(f, "Network error: {}", e),
            ApiError::Unexpected { status, body } if body.is_empty() => {
                write!(f, "Server returned status {}", status)
            }
            ApiError::Unexpected { status, body } => {
                write!(f, "Server returned status {}: {}", status, body)
            }
            ApiError::Decode(e) => write!(f, "Invalid response: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}
