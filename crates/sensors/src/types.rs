//! Common types and traits for vital-sign sample sources

use thiserror::Error;
use vitals_types::Frame;

/// Errors that can occur while reading frames from a source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Invalid source configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// The source has no frame ready right now; the caller may retry
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    /// The source will never produce another frame
    #[error("Source exhausted after {0} frames")]
    Exhausted(u64),
}

/// Producer of per-frame channel samples.
///
/// Implementations are polled once per tick and must not block.
pub trait SampleSource: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Next frame. Channels with no detection this frame are `None`.
    fn next_frame(&mut self) -> Result<Frame, SourceError>;
}
