use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vitals_daemon::config::MonitorConfig;
use vitals_daemon::monitor::Monitor;
use vitals_daemon::recorder::RecordingSession;
use vitals_sensors::{MockVitalsConfig, MockVitalsSource, SampleSource, SourceError};
use vitals_types::{ChannelKind, Frame};

fn config(seed: u64) -> MonitorConfig {
    MonitorConfig {
        source: MockVitalsConfig {
            seed: Some(seed),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn monitor(config: &MonitorConfig) -> Monitor<MockVitalsSource> {
    let source = MockVitalsSource::new(config.source.clone()).unwrap();
    Monitor::new(config, source).unwrap()
}

/// Fails every other frame without ever running out.
struct FlakySource {
    calls: u64,
}

impl SampleSource for FlakySource {
    fn name(&self) -> &str {
        "flaky"
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            return Err(SourceError::Unavailable("no frame".to_string()));
        }
        Ok(Frame {
            frame_id: self.calls,
            pulse: Some(0.5),
            respiration: Some(0.5),
        })
    }
}

#[test]
fn test_missing_detection_skips_push() {
    let cfg = config(1);
    let mut monitor = monitor(&cfg);
    let out = monitor.apply_frame(&Frame {
        frame_id: 0,
        pulse: Some(0.4),
        respiration: None,
    });
    assert_eq!(out.pulse.buffer_len, 1);
    assert_eq!(out.respiration.buffer_len, 0);
    assert_eq!(out.respiration.raw, None);
    assert_eq!(out.pulse.rate, 0);
    assert_eq!(out.pulse.filtered, None);
    assert!(monitor.channel(ChannelKind::Respiration).is_empty());
}

#[test]
fn test_invalid_frame_rate_is_an_error() {
    for fps in [0.0, f64::INFINITY] {
        let mut cfg = config(2);
        cfg.fps = fps;
        let source = MockVitalsSource::new(cfg.source.clone()).unwrap();
        assert!(Monitor::new(&cfg, source).is_err());
    }
}

#[test]
fn test_invalid_band_is_an_error() {
    let mut cfg = config(2);
    cfg.pulse_filter.highcut_hz = 20.0;
    let source = MockVitalsSource::new(cfg.source.clone()).unwrap();
    assert!(Monitor::new(&cfg, source).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_run_fills_buffers() {
    let cfg = config(42);
    let monitor = monitor(&cfg).run(CancellationToken::new(), Some(400)).await;
    assert_eq!(monitor.ticks(), 400);
    let pulse = monitor.channel(ChannelKind::Pulse);
    assert_eq!(pulse.len(), 300);
    assert!(pulse.quality().valid);
}

#[test]
fn test_monitor_estimates_mock_rates() {
    let cfg = config(42);
    let mut monitor = monitor(&cfg);
    let mut last = None;
    for _ in 0..300 {
        last = Some(monitor.tick().unwrap());
    }
    let last = last.unwrap();
    assert!((70..=74).contains(&last.pulse.rate), "pulse {}", last.pulse.rate);
    assert!(last.pulse.filtered.is_some());
    assert_eq!(last.pulse.buffer_len, 300);
    assert_eq!(last.frame_id, 299);
}

#[tokio::test(start_paused = true)]
async fn test_source_errors_skip_ticks() {
    let cfg = MonitorConfig::default();
    let monitor = Monitor::new(&cfg, FlakySource { calls: 0 })
        .unwrap()
        .run(CancellationToken::new(), Some(10))
        .await;
    assert_eq!(monitor.ticks(), 5);
    assert_eq!(monitor.channel(ChannelKind::Pulse).len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_source_stops_run() {
    let mut cfg = config(3);
    cfg.source.frame_limit = Some(12);
    let monitor = monitor(&cfg).run(CancellationToken::new(), None).await;
    assert_eq!(monitor.ticks(), 12);
    assert_eq!(monitor.channel(ChannelKind::Respiration).len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_leaves_buffers_untouched() {
    let cfg = config(4);
    let token = CancellationToken::new();
    token.cancel();
    let monitor = monitor(&cfg).run(token, Some(100)).await;
    assert_eq!(monitor.ticks(), 0);
    assert!(monitor.channel(ChannelKind::Pulse).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recording_session_collects_ticks() {
    let cfg = config(5);
    let monitor = monitor(&cfg);
    let shutdown = CancellationToken::new();
    let session = RecordingSession::new(Duration::from_secs(2), 1.0 / cfg.fps);
    let handle = session.spawn(monitor.subscribe(), shutdown.clone());

    let monitor = monitor.run(shutdown.clone(), Some(150)).await;
    drop(monitor);
    let recording = handle.await.unwrap();

    // Two seconds at 30 fps, give or take the boundary tick.
    assert!((58..=62).contains(&recording.ticks), "ticks {}", recording.ticks);
    assert_eq!(recording.pulse_raw.len(), recording.ticks);
    assert!((recording.sample_period_s - 1.0 / 30.0).abs() < 1e-12);
    // Filtered values only appear once a channel holds 60 samples.
    assert!(recording.pulse_filtered.len() <= recording.ticks.saturating_sub(59));
    assert_eq!(recording.pulse_filtered.len(), recording.pulse_rate.len());
}

#[tokio::test(start_paused = true)]
async fn test_recording_ends_when_monitor_stops() {
    let cfg = config(6);
    let monitor = monitor(&cfg);
    let session = RecordingSession::new(Duration::from_secs(60), 1.0 / cfg.fps);
    let handle = session.spawn(monitor.subscribe(), CancellationToken::new());

    let monitor = monitor.run(CancellationToken::new(), Some(20)).await;
    drop(monitor);
    let recording = handle.await.unwrap();
    assert_eq!(recording.ticks, 20);
    assert!(recording.pulse_filtered.is_empty());
}
