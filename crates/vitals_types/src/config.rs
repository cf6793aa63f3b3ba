//! Configuration types for the vital-sign channels

use serde::{Deserialize, Serialize};

/// Default camera frame rate, which is also the per-channel sampling rate.
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 30.0;
/// Default bound of a channel's sample buffer (about 10 s at 30 fps).
pub const DEFAULT_BUFFER_LENGTH: usize = 300;

/// The physiological signal a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    /// Forehead green-channel intensity, used for heart rate.
    Pulse,
    /// Shoulder vertical position, used for breathing rate.
    Respiration,
}

impl ChannelKind {
    /// Unit label for rates on this channel.
    pub fn rate_unit(&self) -> &'static str {
        match self {
            ChannelKind::Pulse => "BPM",
            ChannelKind::Respiration => "breaths/min",
        }
    }

    pub fn profile(&self) -> ChannelProfile {
        match self {
            ChannelKind::Pulse => ChannelProfile::PULSE,
            ChannelKind::Respiration => ChannelProfile::RESPIRATION,
        }
    }
}

/// Frequency band and filter order of a channel.
///
/// The same profile drives both the bandpass design and the band searched by
/// the rate estimator, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub kind: ChannelKind,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub order: usize,
}

impl ChannelProfile {
    /// 0.7–3.0 Hz, i.e. 42–180 beats per minute.
    pub const PULSE: ChannelProfile = ChannelProfile {
        kind: ChannelKind::Pulse,
        lowcut_hz: 0.7,
        highcut_hz: 3.0,
        order: 5,
    };

    /// 0.1–0.5 Hz, i.e. 6–30 breaths per minute.
    pub const RESPIRATION: ChannelProfile = ChannelProfile {
        kind: ChannelKind::Respiration,
        lowcut_hz: 0.1,
        highcut_hz: 0.5,
        order: 5,
    };

    /// Lowest and highest rate the profile can report, in events per minute.
    pub fn rate_range(&self) -> (f64, f64) {
        (self.lowcut_hz * 60.0, self.highcut_hz * 60.0)
    }
}

/// Per-channel filter configuration.
///
/// Built once per channel and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Bandpass lower cutoff in Hz
    pub lowcut_hz: f64,
    /// Bandpass upper cutoff in Hz
    pub highcut_hz: f64,
    /// Sampling rate of the channel in Hz
    pub sampling_rate_hz: f64,
    /// Butterworth order of the bandpass prototype
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
    /// Median kernel width of the outlier stage
    #[serde(default = "default_median_kernel_size")]
    pub median_kernel_size: usize,
    /// Upper bound on the Savitzky-Golay window
    #[serde(default = "default_smoothing_window_length")]
    pub smoothing_window_length: usize,
    /// Polynomial order of the Savitzky-Golay fit
    #[serde(default = "default_smoothing_poly_order")]
    pub smoothing_poly_order: usize,
    /// Run the median stage
    #[serde(default = "true_default")]
    pub outlier_enabled: bool,
    /// Run the Savitzky-Golay stage
    #[serde(default = "true_default")]
    pub smoothing_enabled: bool,
}

fn default_filter_order() -> usize { 5 }
fn default_median_kernel_size() -> usize { 5 }
fn default_smoothing_window_length() -> usize { 11 }
fn default_smoothing_poly_order() -> usize { 3 }
fn true_default() -> bool { true }

impl FilterConfig {
    /// Configuration with the default stage parameters for a profile.
    pub fn from_profile(profile: &ChannelProfile, sampling_rate_hz: f64) -> Self {
        Self {
            lowcut_hz: profile.lowcut_hz,
            highcut_hz: profile.highcut_hz,
            sampling_rate_hz,
            filter_order: profile.order,
            median_kernel_size: default_median_kernel_size(),
            smoothing_window_length: default_smoothing_window_length(),
            smoothing_poly_order: default_smoothing_poly_order(),
            outlier_enabled: true,
            smoothing_enabled: true,
        }
    }

    pub fn pulse(sampling_rate_hz: f64) -> Self {
        Self::from_profile(&ChannelProfile::PULSE, sampling_rate_hz)
    }

    pub fn respiration(sampling_rate_hz: f64) -> Self {
        Self::from_profile(&ChannelProfile::RESPIRATION, sampling_rate_hz)
    }

    /// The band/order part of this configuration as a profile of `kind`.
    pub fn profile(&self, kind: ChannelKind) -> ChannelProfile {
        ChannelProfile {
            kind,
            lowcut_hz: self.lowcut_hz,
            highcut_hz: self.highcut_hz,
            order: self.filter_order,
        }
    }

    /// Sample period in seconds. Zero when the sampling rate is not positive.
    pub fn sample_period(&self) -> f64 {
        if self.sampling_rate_hz > 0.0 {
            1.0 / self.sampling_rate_hz
        } else {
            0.0
        }
    }
}
