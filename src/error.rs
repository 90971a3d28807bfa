//! # Error Handling
//!
//! This module defines the HTTP-facing error type and how it is converted to responses.
//! Domain errors (`PipelineError`, `CipherError`, `StorageError`, `ProviderError`) live
//! next to the code that raises them; this is the single place where they become
//! status codes and JSON bodies.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of failure
//! - **Pattern matching**: Use `match` to map each failure to a status code
//!
//! ### Traits for Error Conversion
//! - **From trait**: Lets handlers use `?` on pipeline results
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings

use crate::pipeline::PipelineError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// HTTP-facing error types for the application.
///
/// ## Status Code Mapping:
/// - **NotFound** → 404: the artifact expired or never existed
/// - everything else → 500: the translate/fetch contract reports every other
///   failure as a server error carrying a readable reason
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::Validation("text must not be empty".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Request input failed validation (empty text, malformed language code)
    Validation(String),

    /// The translation provider failed
    Translation(String),

    /// The speech synthesis provider failed
    Synthesis(String),

    /// Writing or reading the artifact store failed
    Storage(String),

    /// Requested artifact does not exist
    NotFound(String),

    /// Stored artifact failed authentication (corruption or key mismatch)
    Decryption(String),

    /// Anything else that went wrong on our side
    Internal(String),
}

impl AppError {
    /// Machine-readable error kind used in the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Translation(_) => "translation_error",
            AppError::Synthesis(_) => "synthesis_error",
            AppError::Storage(_) => "storage_error",
            AppError::NotFound(_) => "not_found",
            AppError::Decryption(_) => "decryption_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Translation(msg) => write!(f, "Translation failed: {}", msg),
            AppError::Synthesis(msg) => write!(f, "Speech synthesis failed: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Decryption(msg) => write!(f, "Decryption failed: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts errors into HTTP responses.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": "Not found: audio artifact 'abc' does not exist or has expired",
///   "type": "not_found",
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "type": self.kind(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

/// Map pipeline failures onto HTTP errors.
///
/// Decryption and storage details stay in the logs; clients only get a
/// short description so internal paths and key diagnostics are not leaked.
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => AppError::Validation(msg),
            PipelineError::Translation(e) => AppError::Translation(e.to_string()),
            PipelineError::Synthesis(e) => AppError::Synthesis(e.to_string()),
            PipelineError::Encryption(_) => {
                AppError::Internal("audio could not be encrypted".to_string())
            }
            PipelineError::Storage(_) => {
                AppError::Storage("audio artifact could not be stored or read".to_string())
            }
            PipelineError::NotFound(id) => AppError::NotFound(format!(
                "audio artifact '{}' does not exist or has expired",
                id
            )),
            PipelineError::Decryption(_) => {
                AppError::Decryption("stored audio could not be decrypted".to_string())
            }
        }
    }
}

/// Type alias for handler results.
pub type AppResult<T> = Result<T, AppError>;
