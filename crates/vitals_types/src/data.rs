use serde::{Deserialize, Serialize};

use crate::config::ChannelKind;

/// One video frame's worth of samples as delivered by the upstream producer.
///
/// `None` means the landmark detector found nothing for that channel on this
/// frame, and the channel's buffer must stay unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic frame counter for detecting gaps
    pub frame_id: u64,
    /// Normalized forehead green-channel intensity
    pub pulse: Option<f64>,
    /// Normalized mean shoulder vertical coordinate
    pub respiration: Option<f64>,
}

impl Frame {
    pub fn sample(&self, kind: ChannelKind) -> Option<f64> {
        match kind {
            ChannelKind::Pulse => self.pulse,
            ChannelKind::Respiration => self.respiration,
        }
    }
}

/// What one channel produced on a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTick {
    pub kind: ChannelKind,
    /// The raw sample pushed this tick, if any
    pub raw: Option<f64>,
    /// Last value of the freshly filtered buffer, if the buffer is displayable
    pub filtered: Option<f64>,
    /// Rate in events per minute; 0 means no estimate yet
    pub rate: u32,
    /// Buffer length after the push
    pub buffer_len: usize,
}

/// Output of a single monitor tick. Shared read-only with secondary tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub frame_id: u64,
    pub pulse: ChannelTick,
    pub respiration: ChannelTick,
}

impl TickOutput {
    pub fn channel(&self, kind: ChannelKind) -> &ChannelTick {
        match kind {
            ChannelKind::Pulse => &self.pulse,
            ChannelKind::Respiration => &self.respiration,
        }
    }
}

/// A fixed-duration capture of monitor output.
///
/// One named sequence per channel and stage. Raw sequences only hold ticks on
/// which a sample was pushed; filtered and rate sequences hold one entry per
/// displayable tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub sample_period_s: f64,
    pub ticks: usize,
    pub pulse_raw: Vec<f64>,
    pub pulse_filtered: Vec<f64>,
    pub pulse_rate: Vec<u32>,
    pub respiration_raw: Vec<f64>,
    pub respiration_filtered: Vec<f64>,
    pub respiration_rate: Vec<u32>,
}

impl Recording {
    pub fn new(sample_period_s: f64) -> Self {
        Self {
            sample_period_s,
            ..Default::default()
        }
    }

    /// Append the values of one tick.
    pub fn append(&mut self, tick: &TickOutput) {
        self.ticks += 1;
        Self::append_channel(
            &tick.pulse,
            &mut self.pulse_raw,
            &mut self.pulse_filtered,
            &mut self.pulse_rate,
        );
        Self::append_channel(
            &tick.respiration,
            &mut self.respiration_raw,
            &mut self.respiration_filtered,
            &mut self.respiration_rate,
        );
    }

    fn append_channel(
        tick: &ChannelTick,
        raw: &mut Vec<f64>,
        filtered: &mut Vec<f64>,
        rate: &mut Vec<u32>,
    ) {
        if let Some(v) = tick.raw {
            raw.push(v);
        }
        if let Some(v) = tick.filtered {
            filtered.push(v);
            rate.push(tick.rate);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticks == 0
    }

    /// Mean of the non-zero rates recorded for a channel.
    pub fn mean_rate(&self, kind: ChannelKind) -> Option<f64> {
        let rates = match kind {
            ChannelKind::Pulse => &self.pulse_rate,
            ChannelKind::Respiration => &self.respiration_rate,
        };
        let valid: Vec<f64> = rates.iter().filter(|&&r| r > 0).map(|&r| r as f64).collect();
        if valid.is_empty() {
            None
        } else {
            Some(valid.iter().sum::<f64>() / valid.len() as f64)
        }
    }
}
