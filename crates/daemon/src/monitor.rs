//! Periodic tick loop owning both channel processors

use std::sync::Arc;
use std::time::Duration;

use pipeline::{ChannelProcessor, NO_ESTIMATE};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use vitals_sensors::{SampleSource, SourceError};
use vitals_types::{ChannelKind, ChannelTick, Frame, TickOutput};

use crate::config::MonitorConfig;

/// Drives one tick per frame: poll the source, push samples, filter, estimate
/// and broadcast the result.
///
/// The channel processors are owned here and never shared; subscribers only
/// see the immutable [`TickOutput`] of each tick.
pub struct Monitor<S: SampleSource> {
    source: S,
    pulse: ChannelProcessor,
    respiration: ChannelProcessor,
    tx: broadcast::Sender<Arc<TickOutput>>,
    period: Duration,
    ticks: u64,
    log_every_ticks: u64,
}

impl<S: SampleSource> Monitor<S> {
    /// Validates `config` and builds both channels; bad constants fail here.
    pub fn new(config: &MonitorConfig, source: S) -> anyhow::Result<Self> {
        config.validate()?;
        let pulse = ChannelProcessor::new(
            ChannelKind::Pulse,
            config.pulse_filter.clone(),
            config.buffer_length,
        )?;
        let respiration = ChannelProcessor::new(
            ChannelKind::Respiration,
            config.respiration_filter.clone(),
            config.buffer_length,
        )?;
        let (tx, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Ok(Self {
            source,
            pulse,
            respiration,
            tx,
            period: Duration::from_secs_f64(1.0 / config.fps),
            ticks: 0,
            log_every_ticks: config.log_every_ticks,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TickOutput>> {
        self.tx.subscribe()
    }

    pub fn channel(&self, kind: ChannelKind) -> &ChannelProcessor {
        match kind {
            ChannelKind::Pulse => &self.pulse,
            ChannelKind::Respiration => &self.respiration,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Apply one frame to both channels.
    pub fn apply_frame(&mut self, frame: &Frame) -> TickOutput {
        let pulse = process_channel(&mut self.pulse, frame.pulse);
        let respiration = process_channel(&mut self.respiration, frame.respiration);
        self.ticks += 1;
        TickOutput {
            frame_id: frame.frame_id,
            pulse,
            respiration,
        }
    }

    /// Read one frame from the source, apply it and broadcast the result.
    pub fn tick(&mut self) -> Result<Arc<TickOutput>, SourceError> {
        let frame = self.source.next_frame()?;
        let output = Arc::new(self.apply_frame(&frame));

        if self.log_every_ticks > 0 && self.ticks % self.log_every_ticks == 0 {
            info!(
                "[monitor] frame {}: pulse {} {}, respiration {} {}",
                output.frame_id,
                output.pulse.rate,
                ChannelKind::Pulse.rate_unit(),
                output.respiration.rate,
                ChannelKind::Respiration.rate_unit()
            );
        }
        if self.tx.send(output.clone()).is_err() {
            trace!("[monitor] no subscribers for frame {}", output.frame_id);
        }
        Ok(output)
    }

    /// Tick at the configured frame rate until cancelled, until the source is
    /// exhausted, or after `max_ticks` ticks. Returns the monitor so callers
    /// can inspect the final buffers.
    pub async fn run(mut self, shutdown: CancellationToken, max_ticks: Option<u64>) -> Self {
        info!(
            "[monitor] Starting with source '{}' at {:?} per tick",
            self.source.name(),
            self.period
        );
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ran = 0u64;

        loop {
            if max_ticks.is_some_and(|max| ran >= max) {
                info!("[monitor] Reached {} ticks", ran);
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("[monitor] Received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    ran += 1;
                    match self.tick() {
                        Ok(_) => {}
                        Err(SourceError::Exhausted(frames)) => {
                            info!("[monitor] Source exhausted after {} frames", frames);
                            break;
                        }
                        Err(e) => warn!("[monitor] Skipping tick: {}", e),
                    }
                }
            }
        }

        debug!(
            "[monitor] Stopped after {} ticks, buffers pulse={} respiration={}",
            self.ticks,
            self.pulse.len(),
            self.respiration.len()
        );
        self
    }
}

fn process_channel(channel: &mut ChannelProcessor, sample: Option<f64>) -> ChannelTick {
    if let Some(value) = sample {
        channel.push_sample(value);
    }
    let (filtered, rate) = if channel.is_displayable() {
        let signal = channel.current_filtered_signal();
        let rate = channel.rate_of(&signal);
        (signal.last().copied(), rate)
    } else {
        (None, NO_ESTIMATE)
    };
    ChannelTick {
        kind: channel.kind(),
        raw: sample,
        filtered,
        rate,
        buffer_len: channel.len(),
    }
}
