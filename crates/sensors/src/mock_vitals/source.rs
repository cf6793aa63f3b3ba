use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use vitals_types::{ChannelKind, Frame, DEFAULT_SAMPLING_RATE_HZ};

use super::generator::VitalsGenerator;
use crate::types::{SampleSource, SourceError};

/// Configuration for the mock vitals source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockVitalsConfig {
    /// Frames per second the camera would deliver
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_heart_rate_bpm")]
    pub heart_rate_bpm: f64,
    #[serde(default = "default_breath_rate_bpm")]
    pub breath_rate_bpm: f64,
    /// Standard deviation of additive Gaussian noise
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    /// Per-sample probability of a motion spike
    #[serde(default)]
    pub spike_probability: f64,
    #[serde(default = "default_spike_amplitude")]
    pub spike_amplitude: f64,
    /// Per-channel, per-frame probability of a missed detection
    #[serde(default)]
    pub dropout_probability: f64,
    /// Stop with `Exhausted` after this many frames
    #[serde(default)]
    pub frame_limit: Option<u64>,
    /// Fixed RNG seed; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_fps() -> f64 { DEFAULT_SAMPLING_RATE_HZ }
fn default_heart_rate_bpm() -> f64 { 72.0 }
fn default_breath_rate_bpm() -> f64 { 15.0 }
fn default_noise_std() -> f64 { 0.005 }
fn default_spike_amplitude() -> f64 { 0.5 }

impl Default for MockVitalsConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            heart_rate_bpm: default_heart_rate_bpm(),
            breath_rate_bpm: default_breath_rate_bpm(),
            noise_std: default_noise_std(),
            spike_probability: 0.0,
            spike_amplitude: default_spike_amplitude(),
            dropout_probability: 0.0,
            frame_limit: None,
            seed: None,
        }
    }
}

/// A source that fabricates plausible pulse and respiration samples.
pub struct MockVitalsSource {
    config: MockVitalsConfig,
    generator: VitalsGenerator,
    rng: StdRng,
    frame_count: u64,
}

impl MockVitalsSource {
    pub fn new(config: MockVitalsConfig) -> Result<Self, SourceError> {
        for (name, p) in [
            ("spike_probability", config.spike_probability),
            ("dropout_probability", config.dropout_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SourceError::ConfigurationError(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let generator = VitalsGenerator::new(
            config.fps,
            config.heart_rate_bpm,
            config.breath_rate_bpm,
            config.noise_std,
            &mut rng,
        )?;

        info!("MockVitalsSource created with config: {:?}", config);

        Ok(Self {
            config,
            generator,
            rng,
            frame_count: 0,
        })
    }

    pub fn config(&self) -> &MockVitalsConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn sample(&mut self, kind: ChannelKind) -> Option<f64> {
        if self.rng.gen_bool(self.config.dropout_probability) {
            debug!("frame {}: dropped {:?} detection", self.frame_count, kind);
            return None;
        }
        let mut value = match kind {
            ChannelKind::Pulse => self.generator.pulse_sample(&mut self.rng),
            ChannelKind::Respiration => self.generator.respiration_sample(&mut self.rng),
        };
        if self.rng.gen_bool(self.config.spike_probability) {
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            value += sign * self.config.spike_amplitude;
        }
        Some(value)
    }
}

impl SampleSource for MockVitalsSource {
    fn name(&self) -> &str {
        "mock_vitals"
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return Err(SourceError::Exhausted(self.frame_count));
            }
        }

        self.generator.step();
        let frame = Frame {
            frame_id: self.frame_count,
            pulse: self.sample(ChannelKind::Pulse),
            respiration: self.sample(ChannelKind::Respiration),
        };
        self.frame_count += 1;
        Ok(frame)
    }
}
