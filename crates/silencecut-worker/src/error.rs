//! Worker error types.

use silencecut_media::MediaError;
use silencecut_models::RunKind;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("A {0} run is already in progress")]
    Busy(RunKind),

    #[error("No detection result yet; run detection first")]
    NoDetection,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl WorkerError {
    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Whether the caller could simply try again once the current run ends.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkerError::Busy(_))
    }

    /// Whether the run was stopped on request rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(MediaError::Cancelled))
    }
}

impl From<silencecut_models::ConfigError> for WorkerError {
    fn from(err: silencecut_models::ConfigError) -> Self {
        Self::Media(MediaError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_message_names_run_kind() {
        let err = WorkerError::Busy(RunKind::Materialization);
        assert_eq!(err.to_string(), "A materialization run is already in progress");
        assert!(err.is_busy());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_media_error() {
        let err = WorkerError::from(MediaError::Cancelled);
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_invalid_config_surfaces_as_media_error() {
        let err = WorkerError::from(silencecut_models::ConfigError::NonPositive("sample_rate"));
        assert!(matches!(err, WorkerError::Media(MediaError::InvalidConfiguration(_))));
        assert!(!err.is_busy());
    }
}
