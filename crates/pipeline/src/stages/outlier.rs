//! Median filter for spike removal

use tracing::debug;

use super::{force_odd, SignalStage};

/// Centered running median.
///
/// Edges use half-sample symmetric reflection (`d c b a | a b c d | d c b a`),
/// so the first and last samples see their own neighbours mirrored rather than
/// zeros.
#[derive(Debug, Clone)]
pub struct OutlierFilter {
    kernel_size: usize,
}

impl OutlierFilter {
    /// An even `kernel_size` is silently incremented to the next odd value.
    pub fn new(kernel_size: usize) -> Self {
        Self {
            kernel_size: force_odd(kernel_size),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }
}

/// Index into `0..n` of position `j` under half-sample symmetric reflection.
/// Valid for `-n <= j < 2n`.
fn reflect_index(j: isize, n: usize) -> usize {
    let n = n as isize;
    let r = if j < 0 {
        -j - 1
    } else if j >= n {
        2 * n - j - 1
    } else {
        j
    };
    r as usize
}

impl SignalStage for OutlierFilter {
    fn name(&self) -> &'static str {
        "median"
    }

    fn min_len(&self) -> usize {
        self.kernel_size
    }

    fn apply(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        if n < self.kernel_size {
            debug!("[median] {} samples < kernel {}, passing through", n, self.kernel_size);
            return data.to_vec();
        }

        let half = (self.kernel_size / 2) as isize;
        let mut window = Vec::with_capacity(self.kernel_size);
        (0..n as isize)
            .map(|i| {
                window.clear();
                window.extend((i - half..=i + half).map(|j| data[reflect_index(j, n)]));
                let (_, median, _) = window.select_nth_unstable_by(half as usize, f64::total_cmp);
                *median
            })
            .collect()
    }
}
