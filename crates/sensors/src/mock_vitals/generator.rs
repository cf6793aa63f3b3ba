use std::f64::consts::PI;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::types::SourceError;

const TWO_PI: f64 = 2.0 * PI;

/// Synthetic camera-derived vital signals.
///
/// Pulse is a PPG-like waveform (fundamental plus a dicrotic second
/// harmonic) riding on a slow illumination drift, normalized around 0.5.
/// Respiration is a sinusoidal shoulder displacement, also around 0.5.
#[derive(Debug, Clone)]
pub struct VitalsGenerator {
    pub fps: f64,
    pub heart_rate_bpm: f64,
    pub breath_rate_bpm: f64,
    pub pulse_amplitude: f64,
    pub respiration_amplitude: f64,
    // Phase accumulators
    heart_phase: f64,
    breath_phase: f64,
    drift_phase: f64,
    noise: Normal<f64>,
}

impl VitalsGenerator {
    /// Slow baseline wander, well below the pulse band.
    const DRIFT_HZ: f64 = 0.05;
    const DRIFT_AMPLITUDE: f64 = 0.02;

    pub fn new(
        fps: f64,
        heart_rate_bpm: f64,
        breath_rate_bpm: f64,
        noise_std: f64,
        rng: &mut StdRng,
    ) -> Result<Self, SourceError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SourceError::ConfigurationError(format!(
                "fps must be positive, got {}",
                fps
            )));
        }
        // Normal::new only rejects a non-finite deviation.
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(SourceError::ConfigurationError(format!(
                "noise_std must be finite and non-negative, got {}",
                noise_std
            )));
        }
        let noise = Normal::new(0.0, noise_std).map_err(|e| {
            SourceError::ConfigurationError(format!("noise_std {}: {}", noise_std, e))
        })?;

        debug!(
            "Initializing vitals generator: {} fps, heart {} bpm, breath {} bpm",
            fps, heart_rate_bpm, breath_rate_bpm
        );

        // Random starting phases
        Ok(Self {
            fps,
            heart_rate_bpm,
            breath_rate_bpm,
            pulse_amplitude: 0.1,
            respiration_amplitude: 0.05,
            heart_phase: rng.gen::<f64>() * TWO_PI,
            breath_phase: rng.gen::<f64>() * TWO_PI,
            drift_phase: rng.gen::<f64>() * TWO_PI,
            noise,
        })
    }

    /// Advance all oscillators by one frame.
    pub fn step(&mut self) {
        let dt = 1.0 / self.fps;
        self.heart_phase = wrap(self.heart_phase + TWO_PI * self.heart_rate_bpm / 60.0 * dt);
        self.breath_phase = wrap(self.breath_phase + TWO_PI * self.breath_rate_bpm / 60.0 * dt);
        self.drift_phase = wrap(self.drift_phase + TWO_PI * Self::DRIFT_HZ * dt);
        trace!(
            "phases heart={:.3} breath={:.3}",
            self.heart_phase,
            self.breath_phase
        );
    }

    pub fn pulse_sample(&self, rng: &mut StdRng) -> f64 {
        let wave = self.heart_phase.sin() + 0.3 * (2.0 * self.heart_phase).sin();
        let drift = Self::DRIFT_AMPLITUDE * self.drift_phase.sin();
        0.5 + self.pulse_amplitude * wave + drift + self.noise.sample(rng)
    }

    pub fn respiration_sample(&self, rng: &mut StdRng) -> f64 {
        0.5 + self.respiration_amplitude * self.breath_phase.sin() + self.noise.sample(rng)
    }
}

fn wrap(phase: f64) -> f64 {
    if phase >= TWO_PI {
        phase - TWO_PI
    } else {
        phase
    }
}
