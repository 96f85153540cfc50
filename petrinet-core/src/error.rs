//! Core error types.

use thiserror::Error;

/// Errors from net construction, editing and dispatch.
///
/// Firing rejections are not errors: they come back as a
/// [`FireResult`](crate::model::FireResult) with `ok == false`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown action: {action}")]
    UnknownAction { action: String },

    #[error("unknown place: {label}")]
    UnknownPlace { label: String },

    #[error("unknown transition: {label}")]
    UnknownTransition { label: String },

    #[error("unknown arc at offset {offset}")]
    UnknownArc { offset: usize },

    #[error("unknown schema: {schema}")]
    UnknownSchema { schema: String },

    #[error("label already in use: {label}")]
    LabelInUse { label: String },

    #[error("invalid arc: {reason}")]
    InvalidArc { reason: String },

    #[error("invalid arc weight: {weight} (must be positive)")]
    InvalidWeight { weight: i64 },

    #[error("unsupported operation: {reason}")]
    UnsupportedOperation { reason: String },

    #[error("unsupported declaration version: expected '{expected}', found '{found}'")]
    VersionMismatch { expected: String, found: String },

    #[error("invalid declaration: {reason}")]
    InvalidDeclaration { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns an error code suitable for CLI output or wire responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownAction { .. } => "UNKNOWN_ACTION",
            CoreError::UnknownPlace { .. } => "UNKNOWN_PLACE",
            CoreError::UnknownTransition { .. } => "UNKNOWN_TRANSITION",
            CoreError::UnknownArc { .. } => "UNKNOWN_ARC",
            CoreError::UnknownSchema { .. } => "UNKNOWN_SCHEMA",
            CoreError::LabelInUse { .. } => "LABEL_IN_USE",
            CoreError::InvalidArc { .. } => "INVALID_ARC",
            CoreError::InvalidWeight { .. } => "INVALID_ARC",
            CoreError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            CoreError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CoreError::InvalidDeclaration { .. } => "INVALID_DECLARATION",
            CoreError::Json(_) => "INVALID_DECLARATION",
        }
    }

    /// Returns whether this error was raised while building a net, as opposed
    /// to editing or dispatching against one that already exists.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            CoreError::VersionMismatch { .. }
                | CoreError::InvalidDeclaration { .. }
                | CoreError::Json(_)
        )
    }
}
