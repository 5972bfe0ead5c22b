use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: the resource changed since it was read")]
    PreconditionFailed,

    #[error("Remote error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

impl PlannerError {
    /// Maps a non-success HTTP status to the matching error.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::PRECONDITION_FAILED => PlannerError::PreconditionFailed,
            StatusCode::NOT_FOUND => PlannerError::NotFound(message),
            _ => PlannerError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return PlannerError::from_status(status, err.to_string());
        }

        if err.is_decode() {
            PlannerError::Decode(format!("Cannot decode response: {err}"))
        } else {
            PlannerError::Transport(format!("Request failed: {err}"))
        }
    }
}
