//! Outlier → smoothing → bandpass cascade over a whole buffer snapshot

use tracing::trace;
use vitals_types::FilterConfig;

use crate::error::FilterResult;
use crate::stages::{BandpassFilter, OutlierFilter, SignalStage, SmoothingFilter};

/// Below this many samples the pipeline returns its input untouched.
pub const MIN_PIPELINE_SAMPLES: usize = 30;
/// Smallest Savitzky-Golay window the pipeline will still run.
pub const MIN_SMOOTHING_WINDOW: usize = 5;

/// Fixed three-stage filter cascade for one channel.
///
/// Every call recomputes from scratch over the full input. Each stage falls
/// back to passthrough on its own when the input is too short for it, so a
/// growing buffer simply enables more stages.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    config: FilterConfig,
    outlier: OutlierFilter,
    bandpass: BandpassFilter,
}

impl FilterPipeline {
    /// Validates the bandpass part of `config`.
    pub fn new(config: FilterConfig) -> FilterResult<Self> {
        let bandpass = BandpassFilter::new(
            config.lowcut_hz,
            config.highcut_hz,
            config.sampling_rate_hz,
            config.filter_order,
        )?;
        let outlier = OutlierFilter::new(config.median_kernel_size);
        Ok(Self {
            config,
            outlier,
            bandpass,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn bandpass(&self) -> &BandpassFilter {
        &self.bandpass
    }

    /// Savitzky-Golay window for an input of `len` samples: the configured
    /// window capped at a third of the input, kept odd. `None` when the
    /// result is below [`MIN_SMOOTHING_WINDOW`].
    pub fn smoothing_window_for(&self, len: usize) -> Option<usize> {
        let mut window = self.config.smoothing_window_length.min(len / 3);
        if window % 2 == 0 {
            window = window.saturating_sub(1);
        }
        (window >= MIN_SMOOTHING_WINDOW).then_some(window)
    }

    pub fn process(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < MIN_PIPELINE_SAMPLES {
            trace!(
                "[pipeline] {} samples < {}, returning raw data",
                data.len(),
                MIN_PIPELINE_SAMPLES
            );
            return data.to_vec();
        }

        let mut signal = data.to_vec();
        if self.config.outlier_enabled {
            signal = run_stage(&self.outlier, &signal);
        }
        if self.config.smoothing_enabled {
            if let Some(window) = self.smoothing_window_for(signal.len()) {
                let smoothing = SmoothingFilter::new(window, self.config.smoothing_poly_order);
                signal = run_stage(&smoothing, &signal);
            }
        }
        run_stage(&self.bandpass, &signal)
    }
}

fn run_stage(stage: &dyn SignalStage, signal: &[f64]) -> Vec<f64> {
    trace!("[pipeline] {} on {} samples", stage.name(), signal.len());
    stage.apply(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse() -> FilterPipeline {
        FilterPipeline::new(FilterConfig::pulse(30.0)).unwrap()
    }

    #[test]
    fn test_short_input_returned_unchanged() {
        let p = pulse();
        for n in [0, 1, 10, 29] {
            let data: Vec<f64> = (0..n)
                .map(|i| (i as f64 * 0.37).sin() + 100.0 * (i % 7) as f64)
                .collect();
            assert_eq!(p.process(&data), data);
        }
    }

    #[test]
    fn test_smoothing_window_tracks_length() {
        let p = pulse();
        assert_eq!(p.smoothing_window_for(30), Some(9));
        assert_eq!(p.smoothing_window_for(33), Some(11));
        assert_eq!(p.smoothing_window_for(300), Some(11));
        assert_eq!(p.smoothing_window_for(14), None);
        assert_eq!(p.smoothing_window_for(15), Some(5));
    }

    #[test]
    fn test_between_pipeline_and_bandpass_minimum() {
        // 30..=33 samples: median and smoothing run, bandpass passes through.
        let p = pulse();
        let data: Vec<f64> = (0..32).map(|i| (i as f64 * 0.5).sin()).collect();
        let out = p.process(&data);
        assert_eq!(out.len(), data.len());
        let window = p.smoothing_window_for(32).unwrap();
        let expected = SmoothingFilter::new(window, 3).apply(&OutlierFilter::new(5).apply(&data));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_disabled_stages_skipped() {
        let mut cfg = FilterConfig::pulse(30.0);
        cfg.outlier_enabled = false;
        cfg.smoothing_enabled = false;
        let p = FilterPipeline::new(cfg).unwrap();
        let data: Vec<f64> = (0..120).map(|i| (i as f64 * 0.3).sin()).collect();
        assert_eq!(p.process(&data), p.bandpass().apply(&data));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = FilterConfig::pulse(4.0);
        assert!(FilterPipeline::new(cfg).is_err());
    }
}
