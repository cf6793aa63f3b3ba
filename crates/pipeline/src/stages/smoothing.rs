//! Savitzky-Golay smoothing

use nalgebra::DMatrix;
use tracing::{debug, warn};

use super::{force_odd, SignalStage};

/// Local least-squares polynomial smoother.
///
/// Interior samples are replaced by the value at the window centre of an
/// order-`poly_order` polynomial fitted over `window_length` samples. The
/// first and last `window_length / 2` samples take the values of the
/// polynomial fitted to the first and last full window ("interp" edges).
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    window_length: usize,
    poly_order: usize,
    /// `A (AᵀA)⁻¹ Aᵀ` over one window. `None` when the fit is singular.
    hat: Option<DMatrix<f64>>,
}

/// Window length after the odd / `> poly_order` corrections.
pub fn corrected_window(window_length: usize, poly_order: usize) -> usize {
    let mut w = force_odd(window_length);
    if w <= poly_order {
        w = force_odd(poly_order + 2);
    }
    w
}

impl SmoothingFilter {
    pub fn new(window_length: usize, poly_order: usize) -> Self {
        let window_length = corrected_window(window_length, poly_order);
        let hat = hat_matrix(window_length, poly_order);
        if hat.is_none() {
            warn!(
                "[savgol] singular fit for window {} order {}, stage will pass through",
                window_length, poly_order
            );
        }
        Self {
            window_length,
            poly_order,
            hat,
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    /// Convolution weights applied to interior samples.
    pub fn coefficients(&self) -> Option<Vec<f64>> {
        let half = self.window_length / 2;
        self.hat
            .as_ref()
            .map(|h| h.row(half).iter().copied().collect())
    }
}

fn hat_matrix(window_length: usize, poly_order: usize) -> Option<DMatrix<f64>> {
    let half = (window_length / 2) as f64;
    // Positions scaled into [-1, 1] to keep AᵀA well conditioned.
    let scale = half.max(1.0);
    let a = DMatrix::from_fn(window_length, poly_order + 1, |r, c| {
        ((r as f64 - half) / scale).powi(c as i32)
    });
    let ata_inv = (a.transpose() * &a).try_inverse()?;
    let hat = &a * ata_inv * a.transpose();
    if hat.iter().all(|v| v.is_finite()) {
        Some(hat)
    } else {
        None
    }
}

impl SignalStage for SmoothingFilter {
    fn name(&self) -> &'static str {
        "savgol"
    }

    fn min_len(&self) -> usize {
        self.window_length
    }

    fn apply(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let w = self.window_length;
        if n < w {
            debug!("[savgol] {} samples < window {}, passing through", n, w);
            return data.to_vec();
        }
        let Some(hat) = &self.hat else {
            warn!("[savgol] no usable fit, returning input unchanged");
            return data.to_vec();
        };

        let half = w / 2;
        let dot = |row: usize, start: usize| -> f64 {
            hat.row(row)
                .iter()
                .zip(&data[start..start + w])
                .map(|(c, x)| c * x)
                .sum()
        };

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let y = if i < half {
                dot(i, 0)
            } else if i >= n - half {
                dot(i - (n - w), n - w)
            } else {
                dot(half, i - half)
            };
            out.push(y);
        }
        out
    }
}
