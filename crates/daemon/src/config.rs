use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use vitals_sensors::MockVitalsConfig;
use vitals_types::{ChannelKind, FilterConfig, DEFAULT_BUFFER_LENGTH, DEFAULT_SAMPLING_RATE_HZ};

/// Configuration for the monitor daemon
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Frame rate of the upstream producer; also the tick rate
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Samples kept per channel
    #[serde(default = "default_buffer_length")]
    pub buffer_length: usize,
    #[serde(default = "default_pulse_filter")]
    pub pulse_filter: FilterConfig,
    #[serde(default = "default_respiration_filter")]
    pub respiration_filter: FilterConfig,
    /// Settings for the synthetic sample source
    #[serde(default)]
    pub source: MockVitalsConfig,
    /// Ticks buffered per subscriber before it starts lagging
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// Log the current rates every this many ticks
    #[serde(default = "default_log_every_ticks")]
    pub log_every_ticks: u64,
}

fn default_fps() -> f64 { DEFAULT_SAMPLING_RATE_HZ }
fn default_buffer_length() -> usize { DEFAULT_BUFFER_LENGTH }
fn default_pulse_filter() -> FilterConfig { FilterConfig::pulse(DEFAULT_SAMPLING_RATE_HZ) }
fn default_respiration_filter() -> FilterConfig {
    FilterConfig::respiration(DEFAULT_SAMPLING_RATE_HZ)
}
fn default_broadcast_capacity() -> usize { 64 }
fn default_log_every_ticks() -> u64 { 30 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            buffer_length: default_buffer_length(),
            pulse_filter: default_pulse_filter(),
            respiration_filter: default_respiration_filter(),
            source: MockVitalsConfig::default(),
            broadcast_capacity: default_broadcast_capacity(),
            log_every_ticks: default_log_every_ticks(),
        }
    }
}

impl MonitorConfig {
    pub fn filter_config(&self, kind: ChannelKind) -> &FilterConfig {
        match kind {
            ChannelKind::Pulse => &self.pulse_filter,
            ChannelKind::Respiration => &self.respiration_filter,
        }
    }

    /// Cross-field checks that serde cannot express. Band validity is left
    /// to the filter constructors.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.fps.is_finite() && self.fps > 0.0,
            "fps must be positive and finite, got {}",
            self.fps
        );
        ensure!(self.buffer_length > 0, "buffer_length must be at least 1");
        ensure!(self.broadcast_capacity > 0, "broadcast_capacity must be at least 1");
        for kind in [ChannelKind::Pulse, ChannelKind::Respiration] {
            let fs = self.filter_config(kind).sampling_rate_hz;
            ensure!(
                (fs - self.fps).abs() < 1e-9,
                "{:?} filter sampling rate {} Hz does not match fps {}",
                kind,
                fs,
                self.fps
            );
        }
        ensure!(
            (self.source.fps - self.fps).abs() < 1e-9,
            "source fps {} does not match monitor fps {}",
            self.source.fps,
            self.fps
        );
        Ok(())
    }
}

/// Load the monitor configuration from a JSON file, or the defaults when no
/// path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    let config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).with_context(|| {
                format!("Could not read configuration file at '{}'", path.display())
            })?;
            let config: MonitorConfig = serde_json::from_str(&contents).with_context(|| {
                format!("Could not parse configuration file at '{}'", path.display())
            })?;
            tracing::info!("Loaded configuration from {}", path.display());
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            MonitorConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}
