//! Dominant-frequency rate estimation from a periodogram

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::{debug, warn};
use vitals_types::ChannelProfile;

/// Rate reported when no in-band peak can be found.
pub const NO_ESTIMATE: u32 = 0;

/// One-sided power spectral density.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin frequencies in Hz, ascending from 0
    pub frequencies: Vec<f64>,
    /// Power density per bin
    pub power: Vec<f64>,
    /// FFT length the spectrum was computed with
    pub nfft: usize,
}

/// Boxcar-window periodogram with constant detrend and density scaling.
///
/// `nfft` must be at least `signal.len()`; the detrended signal is
/// zero-padded up to it.
pub fn periodogram(
    planner: &mut FftPlanner<f64>,
    signal: &[f64],
    sampling_rate_hz: f64,
    nfft: usize,
) -> Spectrum {
    let n = signal.len();
    let nfft = nfft.max(n).max(1);
    let mean = if n > 0 { signal.iter().sum::<f64>() / n as f64 } else { 0.0 };

    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(nfft)
        .collect();
    planner.plan_fft_forward(nfft).process(&mut buffer);

    let bins = nfft / 2 + 1;
    let scale = 1.0 / (sampling_rate_hz * n.max(1) as f64);
    let power = buffer
        .iter()
        .take(bins)
        .enumerate()
        .map(|(k, c)| {
            let p = c.norm_sqr() * scale;
            // DC and, for even lengths, Nyquist have no mirrored twin.
            let unpaired = k == 0 || (nfft % 2 == 0 && k == nfft / 2);
            if unpaired {
                p
            } else {
                2.0 * p
            }
        })
        .collect();
    let frequencies = (0..bins).map(|k| k as f64 * sampling_rate_hz / nfft as f64).collect();

    Spectrum {
        frequencies,
        power,
        nfft,
    }
}

/// Index of the strongest bin with `lowcut <= f <= highcut`.
///
/// Bins are scanned in ascending frequency and ties keep the first one.
pub fn dominant_bin(spectrum: &Spectrum, lowcut_hz: f64, highcut_hz: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, (&f, &p)) in spectrum.frequencies.iter().zip(&spectrum.power).enumerate() {
        if f < lowcut_hz || f > highcut_hz {
            continue;
        }
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((k, p)),
        }
    }
    best.map(|(k, _)| k)
}

/// Converts a filtered signal into events per minute.
///
/// The FFT is zero-padded to at least `60 * fs` points, so the frequency grid
/// is never coarser than one event per minute regardless of buffer length.
pub struct RateEstimator {
    profile: ChannelProfile,
    sampling_rate_hz: f64,
    planner: FftPlanner<f64>,
}

impl std::fmt::Debug for RateEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateEstimator")
            .field("profile", &self.profile)
            .field("sampling_rate_hz", &self.sampling_rate_hz)
            .finish_non_exhaustive()
    }
}

impl RateEstimator {
    pub fn new(profile: ChannelProfile, sampling_rate_hz: f64) -> Self {
        Self {
            profile,
            sampling_rate_hz,
            planner: FftPlanner::new(),
        }
    }

    pub fn profile(&self) -> &ChannelProfile {
        &self.profile
    }

    /// FFT length used for a signal of `len` samples.
    pub fn nfft_for(&self, len: usize) -> usize {
        let one_per_minute = (60.0 * self.sampling_rate_hz).ceil() as usize;
        len.max(one_per_minute)
    }

    pub fn spectrum(&mut self, signal: &[f64]) -> Spectrum {
        let nfft = self.nfft_for(signal.len());
        periodogram(&mut self.planner, signal, self.sampling_rate_hz, nfft)
    }

    /// Rate in events per minute, truncated. [`NO_ESTIMATE`] when the signal
    /// is too short, flat, non-finite or has no in-band bin.
    pub fn estimate(&mut self, signal: &[f64]) -> u32 {
        if signal.len() < 2 || !(self.sampling_rate_hz > 0.0) {
            return NO_ESTIMATE;
        }
        if signal.iter().any(|v| !v.is_finite()) {
            warn!("[rate] non-finite samples in {:?} signal, no estimate", self.profile.kind);
            return NO_ESTIMATE;
        }
        if is_flat(signal) {
            debug!("[rate] flat {:?} signal, no estimate", self.profile.kind);
            return NO_ESTIMATE;
        }

        let spectrum = self.spectrum(signal);
        let (lowcut_hz, highcut_hz) = (self.profile.lowcut_hz, self.profile.highcut_hz);
        let Some(k) = dominant_bin(&spectrum, lowcut_hz, highcut_hz) else {
            debug!("[rate] no bin inside {}-{} Hz", lowcut_hz, highcut_hz);
            return NO_ESTIMATE;
        };
        let rate = k as f64 * self.sampling_rate_hz * 60.0 / spectrum.nfft as f64;
        rate.trunc() as u32
    }
}

fn is_flat(signal: &[f64]) -> bool {
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let tol = 1e-12 * mean.abs().max(1.0);
    signal.iter().all(|v| (v - mean).abs() <= tol)
}
