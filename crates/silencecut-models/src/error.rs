//! Configuration validation errors.

use thiserror::Error;

/// Errors raised when a configuration value or input shape is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("threshold fraction {0} is outside [0, 1]")]
    ThresholdOutOfRange(f32),

    #[error("{len} samples cannot be split evenly into {channels} channels")]
    MisalignedSamples { len: usize, channels: u16 },

    #[error("silence interval {index} is invalid: ({start}, {end})")]
    InvalidInterval { index: usize, start: f64, end: f64 },

    #[error("silence interval {index} starts before the previous one ends")]
    OverlappingIntervals { index: usize },

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
        }
    }
}
