//! Filter stages of the per-channel cascade

pub mod bandpass;
pub mod outlier;
pub mod smoothing;

pub use bandpass::{BandpassFilter, SecondOrderSection};
pub use outlier::OutlierFilter;
pub use smoothing::SmoothingFilter;

/// A whole-buffer filter stage.
///
/// Stages never fail on short input: they return the input unchanged and the
/// caller retries once the buffer has grown.
pub trait SignalStage: Send + Sync {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    /// Minimum input length for the stage to do any work
    fn min_len(&self) -> usize;

    /// Filter a complete signal. The output has the input's length.
    fn apply(&self, data: &[f64]) -> Vec<f64>;
}

/// Round an even window or kernel size up to the next odd value.
pub(crate) fn force_odd(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}
