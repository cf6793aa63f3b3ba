//! Zero-phase Butterworth bandpass
//!
//! The filter is designed like a classic analog-prototype IIR: Butterworth
//! poles on the unit circle, prewarped lowpass-to-bandpass transform, then the
//! bilinear transform to the z-plane. The resulting zeros/poles are grouped
//! into second-order sections, which are run forward and then backward over
//! the whole signal so the output carries no phase delay.

use std::f64::consts::PI;

use num_complex::Complex64;
use tracing::{debug, warn};

use super::SignalStage;
use crate::error::{FilterError, FilterResult};

/// One biquad `b(z) / a(z)` with `a[0] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondOrderSection {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl SecondOrderSection {
    /// Direct Form II transposed state that the section settles into under a
    /// constant unit input.
    fn steady_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = self.a[0] + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }
}

/// Butterworth bandpass applied with forward-backward filtering.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    lowcut_hz: f64,
    highcut_hz: f64,
    sampling_rate_hz: f64,
    order: usize,
    /// `None` when the design produced unusable coefficients
    sections: Option<Vec<SecondOrderSection>>,
    /// Per-section steady-state for a unit step, `sosfilt_zi` style
    zi: Vec<[f64; 2]>,
}

impl BandpassFilter {
    pub const DEFAULT_ORDER: usize = 5;

    /// Validate the parameters and design the filter.
    pub fn new(
        lowcut_hz: f64,
        highcut_hz: f64,
        sampling_rate_hz: f64,
        order: usize,
    ) -> FilterResult<Self> {
        validate(lowcut_hz, highcut_hz, sampling_rate_hz, order)?;

        let nyquist = 0.5 * sampling_rate_hz;
        let low = lowcut_hz / nyquist;
        let high = highcut_hz / nyquist;
        let sections = design_sections(low, high, order);
        if sections.is_none() {
            warn!(
                "[bandpass] design failed for {}-{} Hz @ {} Hz order {}, stage will pass through",
                lowcut_hz, highcut_hz, sampling_rate_hz, order
            );
        }
        let zi = sections.as_deref().map(steady_state_conditions).unwrap_or_default();

        Ok(Self {
            lowcut_hz,
            highcut_hz,
            sampling_rate_hz,
            order,
            sections,
            zi,
        })
    }

    pub fn lowcut_hz(&self) -> f64 {
        self.lowcut_hz
    }

    pub fn highcut_hz(&self) -> f64 {
        self.highcut_hz
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sections(&self) -> Option<&[SecondOrderSection]> {
        self.sections.as_deref()
    }

    /// Edge padding used by the forward-backward pass: three times the
    /// transfer-function length `2 * order + 1`.
    pub fn padlen(&self) -> usize {
        3 * (2 * self.order + 1)
    }

    /// Rational transfer function `(b, a)`, each of length `2 * order + 1`.
    pub fn transfer_function(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let sections = self.sections.as_ref()?;
        let mut b = vec![1.0];
        let mut a = vec![1.0];
        for s in sections {
            b = poly_mul(&b, &s.b);
            a = poly_mul(&a, &s.a);
        }
        Some((b, a))
    }

    /// Magnitude of a single forward pass at `freq_hz`. The zero-phase
    /// output is attenuated by the square of this value.
    pub fn magnitude_response(&self, freq_hz: f64) -> Option<f64> {
        let sections = self.sections.as_ref()?;
        let omega = 2.0 * PI * freq_hz / self.sampling_rate_hz;
        let z_inv = Complex64::from_polar(1.0, -omega);
        let h = sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv));
        Some(h.norm())
    }

    fn run_sections(
        &self,
        sections: &[SecondOrderSection],
        input: &[f64],
        initial: f64,
    ) -> Vec<f64> {
        let mut state: Vec<[f64; 2]> = self
            .zi
            .iter()
            .map(|z| [z[0] * initial, z[1] * initial])
            .collect();
        input
            .iter()
            .map(|&sample| {
                let mut x = sample;
                for (s, z) in sections.iter().zip(state.iter_mut()) {
                    let y = s.b[0] * x + z[0];
                    z[0] = s.b[1] * x - s.a[1] * y + z[1];
                    z[1] = s.b[2] * x - s.a[2] * y;
                    x = y;
                }
                x
            })
            .collect()
    }
}

fn validate(
    lowcut_hz: f64,
    highcut_hz: f64,
    sampling_rate_hz: f64,
    order: usize,
) -> FilterResult<()> {
    if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
        return Err(FilterError::InvalidSamplingRate { sampling_rate_hz });
    }
    if !(lowcut_hz > 0.0 && highcut_hz > 0.0) {
        return Err(FilterError::InvalidFrequency {
            message: format!("cutoffs must be positive (low {}, high {})", lowcut_hz, highcut_hz),
        });
    }
    if lowcut_hz >= highcut_hz {
        return Err(FilterError::InvalidFrequency {
            message: format!("low cutoff {} must be below high cutoff {}", lowcut_hz, highcut_hz),
        });
    }
    let nyquist_hz = sampling_rate_hz / 2.0;
    if highcut_hz >= nyquist_hz {
        return Err(FilterError::NyquistViolation { highcut_hz, nyquist_hz });
    }
    if order == 0 {
        return Err(FilterError::InvalidOrder { order });
    }
    Ok(())
}

/// Digital Butterworth bandpass as second-order sections.
///
/// `low` and `high` are normalized to Nyquist. Every section carries one zero
/// at z = 1 and one at z = -1; the overall gain sits on the first section and
/// sections are ordered with the poles nearest the unit circle last.
fn design_sections(low: f64, high: f64, order: usize) -> Option<Vec<SecondOrderSection>> {
    // Bilinear transform with fs = 2, so 2 * fs = 4.
    const FS2: f64 = 4.0;
    let warp = |wn: f64| FS2 * (PI * wn / 2.0).tan();
    let w1 = warp(low);
    let w2 = warp(high);
    let bw = w2 - w1;
    let wo2 = w1 * w2;

    let n = order as i32;
    let mut analog_poles = Vec::with_capacity(2 * order);
    for m in (-n + 1..n).step_by(2) {
        let p = -Complex64::from_polar(1.0, PI * m as f64 / (2.0 * n as f64));
        let p_lp = p * (bw / 2.0);
        let root = (p_lp * p_lp - wo2).sqrt();
        analog_poles.push(p_lp + root);
        analog_poles.push(p_lp - root);
    }

    // N analog zeros at s = 0 contribute FS2^N; the gain of the analog
    // bandpass prototype is bw^N.
    let denom = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (FS2 - *p));
    let gain = (bw * FS2).powi(n) / denom;
    let gain = gain.re;

    let z_poles: Vec<Complex64> = analog_poles.iter().map(|&p| (FS2 + p) / (FS2 - p)).collect();
    let unstable = z_poles
        .iter()
        .any(|p| !p.re.is_finite() || !p.im.is_finite() || p.norm() >= 1.0);
    if unstable || !gain.is_finite() {
        return None;
    }

    let mut pairs: Vec<(f64, [f64; 3])> = Vec::with_capacity(order);
    let mut reals = Vec::new();
    for p in &z_poles {
        let tol = 1e-12 * p.norm().max(1.0);
        if p.im > tol {
            pairs.push((p.norm(), [1.0, -2.0 * p.re, p.norm_sqr()]));
        } else if p.im.abs() <= tol {
            reals.push(p.re);
        }
    }
    if reals.len() % 2 != 0 {
        return None;
    }
    reals.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
    for r in reals.chunks(2) {
        pairs.push((r[0].abs().max(r[1].abs()), [1.0, -(r[0] + r[1]), r[0] * r[1]]));
    }
    if pairs.len() != order {
        return None;
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let sections = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (_, a))| {
            let k = if i == 0 { gain } else { 1.0 };
            SecondOrderSection { b: [k, 0.0, -k], a }
        })
        .collect();
    Some(sections)
}

/// Initial states that make each section start in steady state for a
/// constant input equal to one.
fn steady_state_conditions(sections: &[SecondOrderSection]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|s| {
            let [z0, z1] = s.steady_state();
            let zi = [scale * z0, scale * z1];
            scale *= s.dc_gain();
            zi
        })
        .collect()
}

fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.len() + q.len() - 1];
    for (i, a) in p.iter().enumerate() {
        for (j, b) in q.iter().enumerate() {
            out[i + j] += a * b;
        }
    }
    out
}

/// Odd extension: `2*x[0] - x[padlen..0]`, `x`, `2*x[n-1] - x[n-2..n-2-padlen]`.
fn odd_extend(data: &[f64], padlen: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - data[i]));
    ext.extend_from_slice(data);
    ext.extend((1..=padlen).map(|i| 2.0 * last - data[n - 1 - i]));
    ext
}

impl SignalStage for BandpassFilter {
    fn name(&self) -> &'static str {
        "bandpass"
    }

    fn min_len(&self) -> usize {
        self.padlen() + 1
    }

    fn apply(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let padlen = self.padlen();
        if n <= padlen {
            debug!("[bandpass] {} samples, need more than {}, passing through", n, padlen);
            return data.to_vec();
        }
        let Some(sections) = &self.sections else {
            warn!("[bandpass] no usable design, returning input unchanged");
            return data.to_vec();
        };

        let ext = odd_extend(data, padlen);
        let mut y = self.run_sections(sections, &ext, ext[0]);
        y.reverse();
        let mut y = self.run_sections(sections, &y, y[0]);
        y.reverse();

        let out = y[padlen..padlen + n].to_vec();
        if out.iter().any(|v| !v.is_finite()) {
            warn!("[bandpass] non-finite output for {} samples, returning input unchanged", n);
            return data.to_vec();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, fs: f64, n: usize, amp: f64) -> Vec<f64> {
        (0..n).map(|i| amp * (2.0 * PI * freq_hz * i as f64 / fs).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            BandpassFilter::new(0.0, 3.0, 30.0, 5),
            Err(FilterError::InvalidFrequency { .. })
        ));
        assert!(matches!(
            BandpassFilter::new(0.7, -1.0, 30.0, 5),
            Err(FilterError::InvalidFrequency { .. })
        ));
        assert!(matches!(
            BandpassFilter::new(3.0, 3.0, 30.0, 5),
            Err(FilterError::InvalidFrequency { .. })
        ));
        assert!(matches!(
            BandpassFilter::new(0.7, 3.0, 0.0, 5),
            Err(FilterError::InvalidSamplingRate { .. })
        ));
        assert!(matches!(
            BandpassFilter::new(0.7, 15.0, 30.0, 5),
            Err(FilterError::NyquistViolation { .. })
        ));
        assert!(matches!(
            BandpassFilter::new(0.7, 3.0, 30.0, 0),
            Err(FilterError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_transfer_function_shape() {
        let f = BandpassFilter::new(0.7, 3.0, 30.0, 5).unwrap();
        let (b, a) = f.transfer_function().unwrap();
        assert_eq!(b.len(), 11);
        assert_eq!(a.len(), 11);
        assert!((a[0] - 1.0).abs() < 1e-15);
        assert_eq!(f.padlen(), 33);
        // Bandpass: zero gain at DC and at Nyquist.
        assert!(b.iter().sum::<f64>().abs() < 1e-12);
        let alt: f64 = b.iter().enumerate().map(|(i, v)| if i % 2 == 0 { *v } else { -v }).sum();
        assert!(alt.abs() < 1e-12);
    }

    #[test]
    fn test_half_power_at_cutoffs() {
        for (lo, hi) in [(0.7, 3.0), (0.1, 0.5)] {
            let f = BandpassFilter::new(lo, hi, 30.0, 5).unwrap();
            let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
            assert!((f.magnitude_response(lo).unwrap() - inv_sqrt2).abs() < 1e-6);
            assert!((f.magnitude_response(hi).unwrap() - inv_sqrt2).abs() < 1e-6);
            let centre = (lo * hi).sqrt();
            assert!(f.magnitude_response(centre).unwrap() > 0.99);
            assert!(f.magnitude_response(hi * 3.0).unwrap() < 1e-2);
        }
    }

    #[test]
    fn test_short_input_passes_through() {
        let f = BandpassFilter::new(0.7, 3.0, 30.0, 5).unwrap();
        let data = sine(1.2, 30.0, 33, 1.0);
        assert_eq!(f.apply(&data), data);
        let longer = sine(1.2, 30.0, 34, 1.0);
        assert_ne!(f.apply(&longer), longer);
    }

    #[test]
    fn test_passband_kept_stopband_removed() {
        let f = BandpassFilter::new(0.7, 3.0, 30.0, 5).unwrap();
        let n = 300;
        let inband = sine(1.5, 30.0, n, 1.0);
        let out = f.apply(&inband);
        let r = rms(&out[60..240]) / rms(&inband[60..240]);
        assert!((r - 1.0).abs() < 0.05, "in-band ratio {}", r);

        let outband = sine(8.0, 30.0, n, 1.0);
        let out = f.apply(&outband);
        assert!(rms(&out[100..200]) < 0.02);
    }

    #[test]
    fn test_dc_offset_removed() {
        let f = BandpassFilter::new(0.7, 3.0, 30.0, 5).unwrap();
        let data: Vec<f64> = sine(1.2, 30.0, 300, 0.01).iter().map(|v| v + 0.5).collect();
        let out = f.apply(&data);
        let mean = out[50..250].iter().sum::<f64>() / 200.0;
        assert!(mean.abs() < 1e-3, "mean {}", mean);
    }

    #[test]
    fn test_zero_phase_alignment() {
        let f = BandpassFilter::new(0.7, 3.0, 30.0, 5).unwrap();
        let data = sine(1.5, 30.0, 300, 1.0);
        let out = f.apply(&data);
        // Peaks of the input at 1.5 Hz sit every 20 samples starting at 5.
        for peak in (105..=185).step_by(20) {
            let local = (peak - 3..=peak + 3)
                .max_by(|&a, &b| out[a].total_cmp(&out[b]))
                .unwrap();
            assert_eq!(local, peak);
        }
    }

    #[test]
    fn test_respiration_design_stable() {
        let f = BandpassFilter::new(0.1, 0.5, 30.0, 5).unwrap();
        let sections = f.sections().unwrap();
        assert_eq!(sections.len(), 5);
        for s in sections {
            // |p|^2 of each pole pair must lie inside the unit circle.
            assert!(s.a[2] < 1.0 && s.a[2] > 0.0);
        }
    }
}
