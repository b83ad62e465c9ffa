//! Error types for procwire-router.
//!
//! Two families are kept apart:
//!
//! - [`RpcError`] - request-time failures. Always returned as values and
//!   converted into an error envelope by the dispatcher.
//! - [`RegistryError`] - start-up failures while composing routers. They can
//!   only happen before the registry is handed to a dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single problem found while checking a procedure input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIssue {
    /// Dotted path of the offending field (empty for the whole payload).
    pub path: String,
    /// Human readable description.
    pub message: String,
}

/// All problems found while checking a procedure input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputIssues(Vec<InputIssue>);

impl InputIssues {
    /// Create an empty issue list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single issue for the whole payload.
    pub fn payload(message: impl Into<String>) -> Self {
        let mut issues = Self::new();
        issues.push("", message);
        issues
    }

    /// Record an issue.
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(InputIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Record an issue when `ok` is false.
    pub fn check(&mut self, ok: bool, path: &str, message: &str) -> &mut Self {
        if !ok {
            self.push(path, message);
        }
        self
    }

    /// Number of recorded issues.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded issues.
    pub fn iter(&self) -> impl Iterator<Item = &InputIssue> {
        self.0.iter()
    }

    /// `Ok(())` when empty, otherwise the issues as an error.
    pub fn into_result(self) -> std::result::Result<(), InputIssues> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for InputIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("invalid input");
        }

        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if issue.path.is_empty() {
                f.write_str(&issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path, issue.message)?;
            }
        }
        Ok(())
    }
}

/// Stable error code carried in error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Identity provider could not be reached.
    AuthenticationUnavailable,
    /// Protected procedure called without a session.
    Unauthorized,
    /// Unknown procedure path.
    NotFound,
    /// Payload rejected.
    BadRequest,
    /// Handler failed.
    InternalServerError,
}

impl ErrorCode {
    /// Wire name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AuthenticationUnavailable => "AUTHENTICATION_UNAVAILABLE",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP status used when a single call fails with this code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::AuthenticationUnavailable => 503,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::BadRequest => 400,
            ErrorCode::InternalServerError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-time error for all procwire-router operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Identity provider failed (distinct from "no session").
    #[error("Authentication provider unavailable: {0}")]
    AuthenticationUnavailable(String),

    /// Protected procedure invoked without an authenticated identity.
    #[error("You must be logged in to access this resource.")]
    Unauthorized,

    /// No procedure registered under the given path.
    #[error("No procedure found on path \"{0}\"")]
    ProcedureNotFound(String),

    /// Payload failed the procedure's input contract.
    #[error("Invalid input: {0}")]
    InvalidInput(InputIssues),

    /// Error raised by handler logic. Only the message crosses the boundary.
    #[error("{0}")]
    HandlerFailure(String),

    /// Batch exceeds the configured limit.
    #[error("Batch of {size} calls exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// Request or response body could not be encoded/decoded.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl RpcError {
    /// Shorthand for a handler failure with the given message.
    pub fn handler(message: impl Into<String>) -> Self {
        RpcError::HandlerFailure(message.into())
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::AuthenticationUnavailable(_) => ErrorCode::AuthenticationUnavailable,
            RpcError::Unauthorized => ErrorCode::Unauthorized,
            RpcError::ProcedureNotFound(_) => ErrorCode::NotFound,
            RpcError::InvalidInput(_) | RpcError::BatchTooLarge { .. } | RpcError::Codec(_) => {
                ErrorCode::BadRequest
            }
            RpcError::HandlerFailure(_) => ErrorCode::InternalServerError,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for RpcError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RpcError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RpcError::Codec(e.to_string())
    }
}

/// Start-up error raised while composing the procedure registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Path is already taken.
    #[error("Procedure already registered: {0}")]
    DuplicateProcedure(String),

    /// Path is empty or contains an invalid segment.
    #[error("Invalid procedure path: \"{0}\"")]
    InvalidPath(String),

    /// Alias points at a path that is not registered.
    #[error("Alias target not registered: {0}")]
    UnknownAliasTarget(String),
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
