//! Error types for BD Property services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - User-safe messages (internal detail is logged, never returned)
//! - The `{success, message}` failure envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification in logs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Resource errors (4xxx)
    ListingNotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Store errors (7xxx)
    DatabaseError,
    ConnectionError,
    StoreError,

    // Request errors (9xxx)
    FetchFailed,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ListingNotFound => 4002,
            ErrorCode::RateLimited => 6001,
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::StoreError => 7004,
            ErrorCode::FetchFailed => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Listing not found: {id}")]
    ListingNotFound { id: String },

    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Listing store error: {message}")]
    Store { message: String },

    /// Request-level failure carrying the message shown to the client
    #[error("{message}")]
    FetchFailed { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ListingNotFound { .. } => ErrorCode::ListingNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Store { .. } => ErrorCode::StoreError,
            AppError::FetchFailed { .. } => ErrorCode::FetchFailed,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ListingNotFound { .. } => StatusCode::NOT_FOUND,

            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Store { .. }
            | AppError::FetchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients
    pub fn public_message(&self) -> String {
        match self {
            AppError::ListingNotFound { .. } => "Property not found".to_string(),
            AppError::RateLimited { .. } => "Too many requests".to_string(),
            AppError::FetchFailed { message } => message.clone(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this error means the requested listing does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ListingNotFound { .. })
    }
}

/// Failure envelope returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}
