//! Fixed-duration capture of monitor output

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vitals_types::{Recording, TickOutput};

/// Records already computed ticks for a fixed wall-clock duration.
///
/// Never touches the channel processors; everything comes from the
/// monitor's broadcast.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    duration: Duration,
    sample_period_s: f64,
}

impl RecordingSession {
    pub fn new(duration: Duration, sample_period_s: f64) -> Self {
        Self {
            duration,
            sample_period_s,
        }
    }

    pub fn spawn(
        self,
        receiver: broadcast::Receiver<Arc<TickOutput>>,
        shutdown: CancellationToken,
    ) -> JoinHandle<Recording> {
        tokio::spawn(self.record(receiver, shutdown))
    }

    /// Collect ticks until the duration elapses, the monitor goes away or
    /// shutdown is requested.
    pub async fn record(
        self,
        mut receiver: broadcast::Receiver<Arc<TickOutput>>,
        shutdown: CancellationToken,
    ) -> Recording {
        info!("[recorder] Started recording for {:?}", self.duration);
        let mut recording = Recording::new(self.sample_period_s);
        let deadline = tokio::time::sleep(self.duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("[recorder] Received shutdown signal");
                    break;
                }
                _ = &mut deadline => break,
                tick = receiver.recv() => {
                    match tick {
                        Ok(tick) => recording.append(&tick),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("[recorder] Lagged by {} ticks", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("[recorder] Monitor channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            "[recorder] Stopped recording: {} ticks, {} pulse / {} respiration samples",
            recording.ticks,
            recording.pulse_raw.len(),
            recording.respiration_raw.len()
        );
        recording
    }
}
