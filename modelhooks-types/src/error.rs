//! Error types for the modelhooks service.

use std::backtrace::{Backtrace, BacktraceStatus};

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Schema problems caught while installing hooks (startup only).
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{collection}.{field}: populate path `{path}` is not a field of the schema")]
    UnknownPopulatePath {
        collection: String,
        field: String,
        path: String,
    },

    #[error("{collection}: populate path `{path}` does not hold a reference")]
    NotAReference { collection: String, path: String },
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Entity not found")]
    NotFound,
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

/// Application-level errors returned by model operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Element does not exist".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Serialization(e) => AppError::Internal(e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP-facing errors
// ─────────────────────────────────────────────────────────────────────────────

/// One failing field of a request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub location: String,
    pub messages: Vec<String>,
}

/// Request validation failure carrying every failing field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation error")]
pub struct ValidationError {
    pub status: u16,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST.as_u16(),
            errors,
        }
    }

    /// One sentence out of every field message: messages of a field are
    /// joined with `". "`, fields with `" and "`.
    pub fn unified_message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.messages.join(". "))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Canonical API error shape.
///
/// `is_public` decides whether `message` reaches the caller or is replaced
/// by the reason phrase of `status`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub is_public: bool,
    pub stack: String,
}

impl ApiError {
    /// Creates an error; a status with no known reason phrase becomes 500.
    pub fn new(message: impl Into<String>, status: u16, is_public: bool) -> Self {
        let message = message.into();
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|s| s.canonical_reason().is_some())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .as_u16();

        let stack = capture_stack(&message);

        Self {
            message,
            status,
            is_public,
            stack,
        }
    }

    /// Non-public error with the given status.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self::new(message, status, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND.as_u16(), false)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Reason phrase of the status, e.g. "Not Found".
    pub fn status_phrase(&self) -> &'static str {
        self.status_code().canonical_reason().unwrap_or("Internal Server Error")
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        if self.is_public {
            self.message.clone()
        } else {
            self.status_phrase().to_string()
        }
    }
}

fn capture_stack(message: &str) -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => format!("APIError: {message}\n{backtrace}"),
        _ => format!("APIError: {message}"),
    }
}

/// Anything a route can fail with, before normalization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A bare message with nothing else attached.
    #[error("{0}")]
    Message(String),

    /// Foreign error with whatever status/visibility it happened to carry.
    #[error("{message}")]
    Other {
        message: String,
        status: Option<u16>,
        is_public: Option<bool>,
    },
}

impl RouteError {
    pub fn other(message: impl Into<String>) -> Self {
        RouteError::Other {
            message: message.into(),
            status: None,
            is_public: None,
        }
    }

    /// Status the error reports before normalization.
    pub fn status(&self) -> u16 {
        match self {
            RouteError::Validation(e) => e.status,
            RouteError::Api(e) => e.status,
            RouteError::Message(_) => StatusCode::NOT_FOUND.as_u16(),
            RouteError::Other { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
            }
        }
    }

    /// Coerces any route error into the canonical `ApiError`.
    ///
    /// - validation errors become one public sentence with their own status;
    /// - bare messages become public 404s;
    /// - foreign errors keep message and status, defaulting to 500 and non-public.
    pub fn into_api_error(self) -> ApiError {
        match self {
            RouteError::Validation(e) => ApiError::new(e.unified_message(), e.status, true),
            RouteError::Api(e) => e,
            RouteError::Message(message) => {
                ApiError::new(message, StatusCode::NOT_FOUND.as_u16(), true)
            }
            RouteError::Other {
                message,
                status,
                is_public,
            } => ApiError::new(
                message,
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
                is_public.unwrap_or(false),
            ),
        }
    }
}

impl From<AppError> for RouteError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(e) => RouteError::Validation(e),
            AppError::BadRequest(msg) => {
                RouteError::Api(ApiError::new(msg, StatusCode::BAD_REQUEST.as_u16(), true))
            }
            AppError::NotFound(msg) => RouteError::Api(ApiError::not_found(msg)),
            AppError::Internal(msg) => RouteError::other(msg),
        }
    }
}
