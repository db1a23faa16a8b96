//! Error taxonomy of the acquisition core.
//!
//! * [`ConfigurationError`] is raised locally, before the hardware is touched, and is never
//!   retried.
//! * [`HardwareFault`] comes from the hardware boundary and is propagated unchanged.
//! * [`AcquisitionError::Timeout`] is the only condition a caller may sensibly retry.

use std::time::Duration;

use thiserror::Error;

pub use crate::controller::backend::waveforms_hardware::HardwareFault;
use crate::controller::request::{AcquisitionMode, ChannelId};
use crate::sink::SinkError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error(
        "the number of channels ({channels}) must match the number of {setting} ({values})"
    )]
    LengthMismatch {
        setting: &'static str,
        channels: usize,
        values: usize,
    },

    #[error("analog input channel {channel} does not exist on the selected device{}", capacity_hint(.capacity))]
    InvalidChannel {
        channel: i64,
        capacity: Option<usize>,
    },

    #[error("analog input channel {0} was requested more than once")]
    DuplicateChannel(ChannelId),

    #[error("no analog input channel was requested")]
    EmptyChannelSet,

    #[error("sample rate must be a positive number of samples per second, got {0} S/s")]
    InvalidSampleRate(f64),

    #[error("the selected acquisition mode ({0:?}) is not implemented")]
    UnsupportedMode(AcquisitionMode),

    #[error("no acquisition session has been started")]
    NotStarted,

    #[error("requested channels {requested:?} do not match the session channels {session:?}")]
    ChannelSetMismatch {
        requested: Vec<ChannelId>,
        session: Vec<ChannelId>,
    },

    #[error("requested {requested} samples but the instrument only reported {available} available")]
    FetchExceedsAvailable { requested: usize, available: usize },
}

fn capacity_hint(capacity: &Option<usize>) -> String {
    match capacity {
        Some(capacity) => format!(" ({capacity} channels available)"),
        None => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("hardware fault: {0}")]
    Hardware(#[from] HardwareFault),

    #[error(
        "timeout waiting for analog input samples: read {obtained} out of requested {requested} samples in {:.3} seconds",
        seconds(.elapsed)
    )]
    Timeout {
        obtained: usize,
        requested: usize,
        elapsed: Duration,
    },
}

fn seconds(elapsed: &Duration) -> f64 {
    elapsed.as_secs_f64()
}

impl AcquisitionError {
    /// Only a blocking read timeout may be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, AcquisitionError::Timeout { .. })
    }
}

/// Reasons a streaming session ends early
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("block sink failed: {0}")]
    Sink(#[from] SinkError),
}
