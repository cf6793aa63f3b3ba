//! Streaming filter and rate-estimation core for webcam vital signs
//!
//! Each [`ChannelProcessor`] owns a bounded buffer of raw samples. On every
//! tick the whole buffer is run through a fixed cascade (median outlier
//! rejection, Savitzky-Golay smoothing, zero-phase Butterworth bandpass) and
//! the dominant in-band frequency of the result is reported in events per
//! minute. Nothing here blocks or spawns; callers drive the tick.

pub mod adaptive;
pub mod buffer;
pub mod chain;
pub mod channel;
pub mod error;
pub mod quality;
pub mod rate;
pub mod stages;


// Re-export commonly used types
pub use buffer::SampleBuffer;
pub use chain::{FilterPipeline, MIN_PIPELINE_SAMPLES};
pub use channel::{ChannelProcessor, MIN_DISPLAY_SAMPLES};
pub use error::{FilterError, FilterResult};
pub use quality::{QualityMetrics, QualityReport};
pub use rate::{RateEstimator, Spectrum, NO_ESTIMATE};
pub use stages::{BandpassFilter, OutlierFilter, SignalStage, SmoothingFilter};
