use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::request::ChannelId;

pub mod log;
pub mod passthrough;

/// Fixed size slice of a streaming session, equally long for every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBlock {
    /// Position of this block in the session, starting at 0
    pub sequence: u64,
    pub acquired_at: DateTime<Utc>,
    /// Time of the first sample relative to the session start
    pub start_offset_seconds: f64,
    pub channels: Vec<(ChannelId, Vec<f64>)>,
    /// Session totals when the block was cut
    pub lost: u64,
    pub corrupted: u64,
}

impl SampleBlock {
    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels
            .first()
            .map(|(_, samples)| samples.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples as a (channel, sample) matrix
    pub fn to_array(&self) -> Array2<f64> {
        let len = self.len();
        Array2::from_shape_fn((self.channels.len(), len), |(channel, sample)| {
            self.channels[channel].1[sample]
        })
    }

    pub fn channel_means(&self) -> Vec<(ChannelId, f64)> {
        let means = self.to_array().mean_axis(Axis(1));
        self.channels
            .iter()
            .enumerate()
            .map(|(index, (channel, _))| {
                let mean = means.as_ref().map(|means| means[index]).unwrap_or(f64::NAN);
                (*channel, mean)
            })
            .collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("block sink is closed")]
    Closed,
}

/// Consumer of the blocks produced while streaming
#[async_trait::async_trait]
pub trait BlockSink: Send {
    async fn consume(&mut self, block: SampleBlock) -> Result<(), SinkError>;
}
