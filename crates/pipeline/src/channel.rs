//! Per-channel buffer, filter pipeline and rate estimator

use tracing::{debug, info};
use vitals_types::{ChannelKind, ChannelProfile, FilterConfig, DEFAULT_BUFFER_LENGTH};

use crate::buffer::SampleBuffer;
use crate::chain::FilterPipeline;
use crate::error::FilterResult;
use crate::quality::{self, QualityReport};
use crate::rate::RateEstimator;

/// Buffer length below which a filtered signal is not worth displaying.
pub const MIN_DISPLAY_SAMPLES: usize = 60;

/// One vital-sign channel.
///
/// Owns its sample buffer exclusively; all mutation goes through
/// [`push_sample`](Self::push_sample) and [`reset`](Self::reset).
#[derive(Debug)]
pub struct ChannelProcessor {
    kind: ChannelKind,
    buffer: SampleBuffer,
    pipeline: FilterPipeline,
    estimator: RateEstimator,
}

impl ChannelProcessor {
    /// Build a channel. The bandpass is validated here so that bad constants
    /// fail at startup and never mid-stream.
    pub fn new(
        kind: ChannelKind,
        config: FilterConfig,
        buffer_length: usize,
    ) -> FilterResult<Self> {
        let profile = config.profile(kind);
        let sampling_rate_hz = config.sampling_rate_hz;
        let pipeline = FilterPipeline::new(config)?;
        info!(
            "[{:?}] channel ready: {}-{} Hz, order {}, fs {} Hz, buffer {}",
            kind,
            profile.lowcut_hz,
            profile.highcut_hz,
            profile.order,
            sampling_rate_hz,
            buffer_length
        );
        Ok(Self {
            kind,
            buffer: SampleBuffer::new(buffer_length),
            pipeline,
            estimator: RateEstimator::new(profile, sampling_rate_hz),
        })
    }

    /// Channel with the default configuration of `kind`'s profile.
    pub fn with_profile(profile: ChannelProfile, sampling_rate_hz: f64) -> FilterResult<Self> {
        Self::new(
            profile.kind,
            FilterConfig::from_profile(&profile, sampling_rate_hz),
            DEFAULT_BUFFER_LENGTH,
        )
    }

    pub fn pulse(sampling_rate_hz: f64) -> FilterResult<Self> {
        Self::with_profile(ChannelProfile::PULSE, sampling_rate_hz)
    }

    pub fn respiration(sampling_rate_hz: f64) -> FilterResult<Self> {
        Self::with_profile(ChannelProfile::RESPIRATION, sampling_rate_hz)
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn config(&self) -> &FilterConfig {
        self.pipeline.config()
    }

    pub fn push_sample(&mut self, value: f64) {
        self.buffer.push(value);
    }

    /// Filtered copy of the current buffer. Shorter buffers come back less
    /// filtered (or raw), never as an error.
    pub fn current_filtered_signal(&self) -> Vec<f64> {
        self.pipeline.process(&self.buffer.snapshot())
    }

    /// Events per minute, or 0 while no estimate is available.
    pub fn current_rate_estimate(&mut self) -> u32 {
        let filtered = self.current_filtered_signal();
        self.rate_of(&filtered)
    }

    /// Rate of an already filtered signal, to avoid running the pipeline
    /// twice on one tick.
    pub fn rate_of(&mut self, filtered: &[f64]) -> u32 {
        self.estimator.estimate(filtered)
    }

    /// Whether the buffer holds enough samples for a display consumer.
    pub fn is_displayable(&self) -> bool {
        self.buffer.len() >= MIN_DISPLAY_SAMPLES
    }

    pub fn reset(&mut self) {
        debug!("[{:?}] reset, dropping {} samples", self.kind, self.buffer.len());
        self.buffer.clear();
    }

    pub fn raw_samples(&self) -> Vec<f64> {
        self.buffer.snapshot()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Seconds between consecutive samples.
    pub fn sample_period(&self) -> f64 {
        self.config().sample_period()
    }

    /// Implicit timestamps of the buffered samples.
    pub fn time_axis(&self) -> Vec<f64> {
        self.buffer.time_axis(self.config().sampling_rate_hz)
    }

    /// Quality report over the raw buffer.
    pub fn quality(&self) -> QualityReport {
        quality::assess(&self.buffer.snapshot(), self.config().sampling_rate_hz, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_cold_start_gives_placeholder() {
        let mut ch = ChannelProcessor::pulse(30.0).unwrap();
        assert_eq!(ch.current_rate_estimate(), 0);
        for i in 0..10 {
            ch.push_sample(0.5 + 0.01 * i as f64);
        }
        assert!(!ch.is_displayable());
        assert_eq!(ch.current_filtered_signal(), ch.raw_samples());
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut ch = ChannelProcessor::respiration(30.0).unwrap();
        for i in 0..100 {
            ch.push_sample((i as f64 * 0.05).sin());
        }
        assert!(ch.is_displayable());
        ch.reset();
        assert!(ch.is_empty());
        assert!(ch.time_axis().is_empty());
    }

    #[test]
    fn test_buffer_bounded_by_config() {
        let mut ch =
            ChannelProcessor::new(ChannelKind::Pulse, FilterConfig::pulse(30.0), 120).unwrap();
        for i in 0..500 {
            ch.push_sample((2.0 * PI * 1.2 * i as f64 / 30.0).sin());
        }
        assert_eq!(ch.len(), 120);
        assert_eq!(ch.current_filtered_signal().len(), 120);
        assert!((ch.time_axis()[0] - 380.0 / 30.0).abs() < 1e-9);
        assert!((ch.sample_period() - 1.0 / 30.0).abs() < 1e-15);
    }

    #[test]
    fn test_bad_sampling_rate_fails_fast() {
        assert!(ChannelProcessor::pulse(0.0).is_err());
        assert!(ChannelProcessor::pulse(5.0).is_err());
    }
}
