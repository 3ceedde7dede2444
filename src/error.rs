use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl From<serde_json::Error> for LgtmError {
    fn from(err: serde_json::Error) -> Self {
        Self::WebhookError(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for LgtmError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

impl From<octocrab::Error> for LgtmError {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LgtmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("GitHub API error: {0}")]
    GitHubError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Maintainers error: {0}")]
    MaintainersError(String),

    #[error("Webhook processing error: {0}")]
    WebhookError(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,
}

impl LgtmError {
    /// HTTP status reported to the webhook caller.
    ///
    /// Unknown repositories and owners are client-visible 404s, a bad
    /// signature is a 401, everything else that aborts an evaluation is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn repo_not_found() -> Self {
        Self::NotFound("Repository not found.".to_string())
    }

    pub fn owner_not_found() -> Self {
        Self::NotFound("Repository owner not found.".to_string())
    }
}

impl IntoResponse for LgtmError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
