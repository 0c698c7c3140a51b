//! Structured error types for user actions.

use crate::store::StoreError;
use crate::types::TaskStatus;
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTransition,

    // Not found errors
    TaskNotFound,
    SubtaskNotFound,
    AmbiguousId,

    // Notification errors
    NotificationsDisabled,
    PermissionDenied,

    // Internal errors
    StorageError,
    InternalError,
}

/// Structured error returned by [`crate::app::AppState`] operations.
#[derive(Debug, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_transition(from: TaskStatus, to: TaskStatus) -> Self {
        Self::new(
            ErrorCode::InvalidTransition,
            format!("Cannot move a task from {} to {}", from, to),
        )
        .with_field("status")
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn subtask_not_found(task_id: &str, subtask_id: &str) -> Self {
        Self::new(
            ErrorCode::SubtaskNotFound,
            format!("Subtask {} not found on task {}", subtask_id, task_id),
        )
    }

    pub fn ambiguous_id(prefix: &str, matches: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousId,
            format!("Id prefix {} matches {} ids", prefix, matches.len()),
        )
        .with_details(matches.join(", "))
    }

    pub fn notifications_disabled() -> Self {
        Self::new(
            ErrorCode::NotificationsDisabled,
            "Notifications are turned off. Enable them first.",
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            "Notification permission was denied. Allow notifications for this program and try again.",
        )
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::storage(err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => AppError::internal(err),
        }
    }
}

/// Result type for user actions.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_code_and_skips_empty_fields() {
        let err = AppError::task_not_found("abc");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "TASK_NOT_FOUND");
        assert!(value.get("field").is_none());
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let err: anyhow::Error = AppError::permission_denied().into();
        let back = AppError::from(err);
        assert_eq!(back.code, ErrorCode::PermissionDenied);
    }
}
