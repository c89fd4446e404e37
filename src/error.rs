//! Error types for Lectern server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned alongside the human-readable message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    Conflict = 5,
    NoSuchBook = 10,
    NoSuchMember = 11,
    NoSuchLoan = 12,
    NoCopiesAvailable = 13,
    NoActiveLoan = 14,
    LoanAlreadyReturned = 15,
    LoanOverdue = 16,
    InvalidDuration = 17,
    QueueFailure = 20,
    MailFailure = 21,
}

/// Coarse classification of ledger failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StateConflict,
}

/// Failures of the loan/return/extend transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("Book {0} does not exist.")]
    BookNotFound(i32),

    #[error("Member does not exist.")]
    MemberNotFound,

    #[error("Loan {0} does not exist.")]
    LoanNotFound(i32),

    #[error("No available copies.")]
    NoCopiesAvailable,

    #[error("Active loan does not exist.")]
    NoActiveLoan,

    #[error("Can not extend a returned loan.")]
    AlreadyReturned,

    #[error("Can not extend an overdue loan.")]
    AlreadyOverdue,

    #[error("additional_days should be a positive integer.")]
    InvalidDuration,

    #[error("Invalid additional_days value.")]
    UnparsableDuration,
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanError::BookNotFound(_)
            | LoanError::MemberNotFound
            | LoanError::LoanNotFound(_) => ErrorKind::NotFound,
            LoanError::InvalidDuration | LoanError::UnparsableDuration => ErrorKind::Validation,
            LoanError::NoCopiesAvailable
            | LoanError::NoActiveLoan
            | LoanError::AlreadyReturned
            | LoanError::AlreadyOverdue => ErrorKind::StateConflict,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            LoanError::BookNotFound(_) => ErrorCode::NoSuchBook,
            LoanError::MemberNotFound => ErrorCode::NoSuchMember,
            LoanError::LoanNotFound(_) => ErrorCode::NoSuchLoan,
            LoanError::NoCopiesAvailable => ErrorCode::NoCopiesAvailable,
            LoanError::NoActiveLoan => ErrorCode::NoActiveLoan,
            LoanError::AlreadyReturned => ErrorCode::LoanAlreadyReturned,
            LoanError::AlreadyOverdue => ErrorCode::LoanOverdue,
            LoanError::InvalidDuration | LoanError::UnparsableDuration => {
                ErrorCode::InvalidDuration
            }
        }
    }

    /// A missing path resource is a 404. A member named in the body is
    /// client input, so its absence is a 400 like every other kind.
    fn status(&self) -> StatusCode {
        match (self.kind(), self) {
            (_, LoanError::MemberNotFound) => StatusCode::BAD_REQUEST,
            (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
            (ErrorKind::Validation | ErrorKind::StateConflict, _) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error(transparent)]
    Loan(#[from] LoanError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    pub code: u32,
    /// Symbolic name of `code`
    pub reason: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Queue(msg) => {
                tracing::error!("Job queue error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::QueueFailure,
                    "Job queue unavailable".to_string(),
                )
            }
            AppError::Mail(msg) => {
                tracing::error!("Mail error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::MailFailure,
                    "Mail transport failure".to_string(),
                )
            }
            AppError::Loan(err) => {
                tracing::debug!(kind = ?err.kind(), error = %err, "Loan request refused");
                (err.status(), err.code(), err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code as u32,
            reason: format!("{:?}", code),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
