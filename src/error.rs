use serde::Serialize;
use thiserror::Error;

/// Failures surfaced to the UI. Every variant leaves the app interactive.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Can't find food item {barcode}: {reason}")]
    LookupFailed { barcode: String, reason: String },

    #[error("Lookup for {barcode} was cancelled")]
    Cancelled { barcode: String },

    #[error("Storage error: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn lookup_failed(barcode: &str, reason: impl Into<String>) -> Self {
        AppError::LookupFailed {
            barcode: barcode.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether repeating the same action could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::LookupFailed { .. } | AppError::Cancelled { .. } | AppError::Persistence(_)
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Persistence(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// What the UI bridge receives when a command fails. `retryable` tells the
/// view whether to offer the same action again.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct CommandError {
    pub message: String,
    pub retryable: bool,
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        CommandError {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        AppError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(AppError::lookup_failed("1", "timeout").is_retryable());
        assert!(AppError::Persistence(anyhow::anyhow!("disk full")).is_retryable());
        assert!(!AppError::InvalidInput("empty".into()).is_retryable());
        assert!(!AppError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn command_error_carries_message_and_retryability() {
        let err = CommandError::from(AppError::lookup_failed("012345", "HTTP 503"));
        assert_eq!(err.message, "Can't find food item 012345: HTTP 503");
        assert!(err.retryable);

        let err = CommandError::from(AppError::InvalidInput("barcode must not be empty".into()));
        assert!(!err.retryable);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({
                "message": "Invalid input: barcode must not be empty",
                "retryable": false
            })
        );
    }

    #[test]
    fn persistence_message_includes_context_chain() {
        let err: AppError = anyhow::anyhow!("locked")
            .context("failed to delete log entry 3")
            .into();
        assert_eq!(
            err.to_string(),
            "Storage error: failed to delete log entry 3: locked"
        );
    }
}
