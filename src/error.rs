//! Error types shared by every remote call and by the persisted session store.

use thiserror::Error;

use crate::validation::ValidationErrors;

pub const FALLBACK_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("login required")]
    NotAuthenticated,

    #[error("admin role required")]
    Forbidden,

    #[error("invalid input: {0}")]
    Validation(ValidationErrors),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl ApiError {
    /// Text for a transient notification, preferring what the server said.
    pub fn user_message(&self) -> String {
        self.user_message_or(FALLBACK_MESSAGE)
    }

    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::Validation(errors) => errors.to_string(),
            ApiError::NotAuthenticated => "Please sign in first".to_string(),
            ApiError::Forbidden => "Access denied".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
