//! Filter parameters tuned to a signal's length and spread

use tracing::debug;
use vitals_types::{ChannelKind, FilterConfig};

const SHORT_SIGNAL: usize = 100;
const NOISY_STD: f64 = 0.1;
const SPREAD_STD: f64 = 0.05;
const CLEAN_STD: f64 = 0.01;
const MAX_WINDOW: usize = 21;

/// Recommend a configuration for `kind` given a sample of its data.
///
/// Starts from the channel profile's defaults. Short signals get a gentler
/// bandpass, noisy ones a steeper bandpass and a wider median kernel, and
/// the smoothing window never exceeds a fifth of the signal.
pub fn recommend(data: &[f64], kind: ChannelKind, sampling_rate_hz: f64) -> FilterConfig {
    let mut config = FilterConfig::from_profile(&kind.profile(), sampling_rate_hz);
    let std = population_std(data);
    let n = data.len();

    if n < SHORT_SIGNAL {
        config.filter_order = 3;
    } else if std > NOISY_STD {
        config.filter_order = 6;
    }

    if std > SPREAD_STD {
        config.median_kernel_size = 7;
    } else if std < CLEAN_STD {
        config.median_kernel_size = 3;
    }

    let mut max_window = MAX_WINDOW.min(n / 5).max(5);
    if max_window % 2 == 0 {
        max_window -= 1;
    }
    config.smoothing_window_length = config.smoothing_window_length.min(max_window);

    debug!(
        "[adaptive] {:?}: n={} std={:.4} -> order {}, kernel {}, window {}",
        kind, n, std, config.filter_order, config.median_kernel_size, config.smoothing_window_length
    );
    config
}

fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    (data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize, amplitude: f64) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { amplitude } else { -amplitude }).collect()
    }

    #[test]
    fn test_defaults_for_moderate_signal() {
        let cfg = recommend(&square(300, 0.03), ChannelKind::Pulse, 30.0);
        assert_eq!(cfg.filter_order, 5);
        assert_eq!(cfg.median_kernel_size, 5);
        assert_eq!(cfg.smoothing_window_length, 11);
        assert_eq!(cfg.smoothing_poly_order, 3);
        assert_eq!(cfg.lowcut_hz, 0.7);
        assert_eq!(cfg.highcut_hz, 3.0);
    }

    #[test]
    fn test_short_signal_lowers_order() {
        let cfg = recommend(&square(40, 0.5), ChannelKind::Respiration, 30.0);
        assert_eq!(cfg.filter_order, 3);
        assert_eq!(cfg.median_kernel_size, 7);
        // 40 / 5 = 8, made odd.
        assert_eq!(cfg.smoothing_window_length, 7);
        assert_eq!(cfg.lowcut_hz, 0.1);
    }

    #[test]
    fn test_noisy_signal_raises_order() {
        let cfg = recommend(&square(300, 0.5), ChannelKind::Pulse, 30.0);
        assert_eq!(cfg.filter_order, 6);
        assert_eq!(cfg.median_kernel_size, 7);
    }

    #[test]
    fn test_clean_signal_small_kernel() {
        let cfg = recommend(&square(300, 0.001), ChannelKind::Pulse, 30.0);
        assert_eq!(cfg.median_kernel_size, 3);
    }

    #[test]
    fn test_window_floor() {
        let cfg = recommend(&[], ChannelKind::Pulse, 30.0);
        assert_eq!(cfg.smoothing_window_length, 5);
        assert_eq!(cfg.filter_order, 3);
    }
}
