use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_daemon::config::load_config;
use vitals_daemon::monitor::Monitor;
use vitals_daemon::recorder::RecordingSession;
use vitals_sensors::MockVitalsSource;
use vitals_types::ChannelKind;

/// Headless webcam vital-sign monitor
#[derive(Parser, Debug)]
#[command(name = "vitals_monitor", about = "Pulse and respiration rate monitor")]
struct Args {
    /// JSON configuration file; defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the mock sample source
    #[arg(long)]
    mock_seed: Option<u64>,
    /// Record this many seconds of output and print a summary
    #[arg(long)]
    record_seconds: Option<f64>,
    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitals_daemon=info,vitals_monitor=info,pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Vitals monitor starting...");
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.mock_seed {
        config.source.seed = Some(seed);
    }

    let source =
        MockVitalsSource::new(config.source.clone()).context("Failed to create mock source")?;
    let monitor = Monitor::new(&config, source).context("Invalid monitor configuration")?;

    let shutdown = CancellationToken::new();
    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received. Stopping services...");
        }
        ctrl_c_token.cancel();
    });

    let recorder = match args.record_seconds {
        Some(seconds) if seconds > 0.0 => {
            let session = RecordingSession::new(Duration::from_secs_f64(seconds), 1.0 / config.fps);
            Some(session.spawn(monitor.subscribe(), shutdown.clone()))
        }
        Some(seconds) => {
            tracing::warn!("Ignoring non-positive --record-seconds {}", seconds);
            None
        }
        None => None,
    };

    let monitor = monitor.run(shutdown.clone(), args.ticks).await;
    for kind in [ChannelKind::Pulse, ChannelKind::Respiration] {
        let channel = monitor.channel(kind);
        let quality = channel.quality();
        tracing::info!(
            "{:?}: {} samples buffered, quality {}",
            kind,
            channel.len(),
            if quality.valid { "ok" } else { "poor" }
        );
    }
    // Closes the broadcast so a running recorder finishes.
    drop(monitor);

    if let Some(handle) = recorder {
        let recording = handle.await.context("Recording task failed")?;
        let summary = serde_json::json!({
            "ticks": recording.ticks,
            "sample_period_s": recording.sample_period_s,
            "pulse_samples": recording.pulse_raw.len(),
            "respiration_samples": recording.respiration_raw.len(),
            "mean_pulse_rate": recording.mean_rate(ChannelKind::Pulse),
            "mean_respiration_rate": recording.mean_rate(ChannelKind::Respiration),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    shutdown.cancel();
    tracing::info!("Vitals monitor stopped gracefully.");
    Ok(())
}
