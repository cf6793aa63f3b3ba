//! Error types for the filter pipeline

use thiserror::Error;

/// Filter configuration errors.
///
/// These are only raised while a filter is being configured, never while a
/// stream is being processed. They indicate bad constants and are meant to be
/// fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid cutoff frequency: {message}")]
    InvalidFrequency { message: String },

    #[error("Invalid sampling rate: {sampling_rate_hz} Hz (must be positive)")]
    InvalidSamplingRate { sampling_rate_hz: f64 },

    #[error("High cutoff {highcut_hz} Hz must be below the Nyquist frequency {nyquist_hz} Hz")]
    NyquistViolation { highcut_hz: f64, nyquist_hz: f64 },

    #[error("Invalid filter order: {order} (must be at least 1)")]
    InvalidOrder { order: usize },
}

/// Result type for filter configuration
pub type FilterResult<T> = Result<T, FilterError>;
