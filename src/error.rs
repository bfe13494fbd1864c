use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// One entry of a `ValidationFailed` error, mirroring the wire shape
/// `{field, message, value}`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(field: &str, message: &str, value: Option<serde_json::Value>) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            value,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("An account with this email address already exists")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid email address or password")]
    InvalidCredentials,

    #[error("Account is deactivated. Please contact support.")]
    AccountDeactivated,

    #[error("Insufficient funds for this transaction")]
    InsufficientFunds,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid pagination parameters. Page must be >= 1, limit must be between 1 and 100.")]
    InvalidPagination,

    #[error("Invalid {0} date format")]
    InvalidDateFormat(&'static str),

    #[error("Transaction not found")]
    NotFound,

    #[error("Invalid transaction ID format")]
    InvalidId,

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateEmail
            | Self::InsufficientFunds
            | Self::Validation(_)
            | Self::InvalidPagination
            | Self::InvalidDateFormat(_)
            | Self::InvalidId => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::AccountDeactivated | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserNotFound | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope: `{success: false, message, errors?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail goes to the log, never to the client.
        let message = match &self {
            Self::Database(e) => {
                error!(error = %e, "database error");
                "Something went wrong. Please try again.".to_string()
            }
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let errors = match self {
            Self::Validation(errs) => Some(errs),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
                errors,
            }),
        )
            .into_response()
    }
}

/// Success envelope: `{success: true, message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data,
        })
    }
}
