//! Raw-signal sanity report

use serde::Serialize;
use tracing::debug;
use vitals_types::ChannelKind;

/// Seconds of data needed before a signal is judged at all.
pub const MIN_DURATION_S: f64 = 2.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub length: usize,
    pub duration_s: f64,
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub nan_count: usize,
    pub inf_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub valid: bool,
    pub messages: Vec<String>,
    pub metrics: QualityMetrics,
}

/// Judge whether `data` is usable for rate estimation.
///
/// Statistics are taken over the finite samples only. Channel-specific
/// checks add advisory messages without invalidating the report.
pub fn assess(data: &[f64], sampling_rate_hz: f64, kind: ChannelKind) -> QualityReport {
    let mut valid = true;
    let mut messages = Vec::new();

    let min_samples = (MIN_DURATION_S * sampling_rate_hz) as usize;
    if data.len() < min_samples {
        valid = false;
        messages.push(format!(
            "Data too short: {} samples, need at least {}",
            data.len(),
            min_samples
        ));
    }

    let nan_count = data.iter().filter(|v| v.is_nan()).count();
    let inf_count = data.iter().filter(|v| v.is_infinite()).count();
    if nan_count > 0 || inf_count > 0 {
        valid = false;
        messages.push(format!("Invalid values: {} NaN, {} infinite", nan_count, inf_count));
    }

    let metrics = metrics(data, sampling_rate_hz, nan_count, inf_count);
    if metrics.variance < 1e-10 {
        valid = false;
        messages.push(format!("Signal too flat: variance = {:.2e}", metrics.variance));
    }
    if metrics.range < 1e-6 {
        valid = false;
        messages.push(format!("Signal dynamic range too small: {:.2e}", metrics.range));
    }

    match kind {
        ChannelKind::Pulse if metrics.min < -0.1 || metrics.max > 1.1 => {
            messages.push("Pulse signal outside expected range [0, 1]".to_string());
        }
        ChannelKind::Respiration if metrics.range < 0.01 => {
            messages.push("Respiration signal amplitude too small".to_string());
        }
        _ => {}
    }

    if valid {
        messages.push("Signal quality validation PASSED".to_string());
    } else {
        messages.insert(0, "Signal quality validation FAILED:".to_string());
    }
    debug!("[quality] {:?}: valid={} over {} samples", kind, valid, data.len());

    QualityReport {
        valid,
        messages,
        metrics,
    }
}

fn metrics(
    data: &[f64],
    sampling_rate_hz: f64,
    nan_count: usize,
    inf_count: usize,
) -> QualityMetrics {
    let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    let duration_s = if sampling_rate_hz > 0.0 {
        data.len() as f64 / sampling_rate_hz
    } else {
        0.0
    };
    if finite.is_empty() {
        return QualityMetrics {
            length: data.len(),
            duration_s,
            nan_count,
            inf_count,
            ..Default::default()
        };
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    QualityMetrics {
        length: data.len(),
        duration_s,
        mean,
        std: variance.sqrt(),
        variance,
        min,
        max,
        range: max - min,
        nan_count,
        inf_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn pulse_like(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.5 + 0.2 * (2.0 * PI * 1.2 * i as f64 / 30.0).sin()).collect()
    }

    #[test]
    fn test_good_signal_passes() {
        let report = assess(&pulse_like(300), 30.0, ChannelKind::Pulse);
        assert!(report.valid);
        assert_eq!(report.messages.last().unwrap(), "Signal quality validation PASSED");
        assert_eq!(report.metrics.length, 300);
        assert!((report.metrics.duration_s - 10.0).abs() < 1e-12);
        assert!((report.metrics.mean - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_signal_fails() {
        let report = assess(&pulse_like(59), 30.0, ChannelKind::Pulse);
        assert!(!report.valid);
        assert_eq!(report.messages[0], "Signal quality validation FAILED:");
        assert!(report.messages[1].starts_with("Data too short: 59 samples"));
    }

    #[test]
    fn test_flat_signal_fails() {
        let report = assess(&vec![0.4; 120], 30.0, ChannelKind::Pulse);
        assert!(!report.valid);
        assert!(report.messages.iter().any(|m| m.starts_with("Signal too flat")));
        assert!(report.messages.iter().any(|m| m.starts_with("Signal dynamic range too small")));
    }

    #[test]
    fn test_non_finite_counted_and_ignored_in_stats() {
        let mut data = pulse_like(120);
        data[5] = f64::NAN;
        data[6] = f64::INFINITY;
        let report = assess(&data, 30.0, ChannelKind::Pulse);
        assert!(!report.valid);
        assert_eq!(report.metrics.nan_count, 1);
        assert_eq!(report.metrics.inf_count, 1);
        assert!(report.metrics.mean.is_finite());
        assert!(report.messages.contains(&"Invalid values: 1 NaN, 1 infinite".to_string()));
    }

    #[test]
    fn test_advisories_do_not_invalidate() {
        let loud: Vec<f64> = pulse_like(120).iter().map(|v| v * 4.0).collect();
        let report = assess(&loud, 30.0, ChannelKind::Pulse);
        assert!(report.valid);
        assert!(report.messages.iter().any(|m| m.contains("outside expected range")));

        let shallow: Vec<f64> = (0..120).map(|i| 0.001 * (i as f64 * 0.05).sin()).collect();
        let report = assess(&shallow, 30.0, ChannelKind::Respiration);
        assert!(report.valid);
        assert!(report.messages.contains(&"Respiration signal amplitude too small".to_string()));
    }
}
