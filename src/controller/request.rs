use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uom::si::{
    electric_potential::volt,
    f64::{ElectricPotential, Frequency, Time},
    frequency::hertz,
    time::second,
};

use crate::controller::backend::waveforms_hardware::{HardwareFault, RecordLength};
use crate::error::ConfigurationError;

/// Index of an analog input channel on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ChannelId(u16);

impl ChannelId {
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<i64> for ChannelId {
    type Error = ConfigurationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(ChannelId)
            .map_err(|_| ConfigurationError::InvalidChannel {
                channel: value,
                capacity: None,
            })
    }
}

impl From<ChannelId> for i64 {
    fn from(value: ChannelId) -> Self {
        value.0 as i64
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One value per channel, kept as pairs so channels and values can never disagree in length
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings<T>(Vec<(ChannelId, T)>);

impl<T> ChannelSettings<T> {
    pub fn new(pairs: Vec<(ChannelId, T)>) -> Self {
        Self(pairs)
    }

    /// Pair up two separately built lists, `setting` names the values in the error message
    pub fn zip(
        channels: &[ChannelId],
        values: Vec<T>,
        setting: &'static str,
    ) -> Result<Self, ConfigurationError> {
        if channels.len() != values.len() {
            return Err(ConfigurationError::LengthMismatch {
                setting,
                channels: channels.len(),
                values: values.len(),
            });
        }

        Ok(Self(channels.iter().copied().zip(values).collect()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ChannelId, T)> {
        self.0.iter()
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.0.iter().map(|(channel, _)| *channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Clone> ChannelSettings<T> {
    /// The same value for every channel
    pub fn uniform(channels: &[ChannelId], value: T) -> Self {
        Self(
            channels
                .iter()
                .map(|channel| (*channel, value.clone()))
                .collect(),
        )
    }
}

/// Analog input acquisition modes, discriminants are the WaveForms SDK codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    Single = 0,
    ScanShift = 1,
    ScanScreen = 2,
    #[default]
    Record = 3,
    Overs = 4,
    Single1 = 5,
}

impl AcquisitionMode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for AcquisitionMode {
    type Error = HardwareFault;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AcquisitionMode::Single),
            1 => Ok(AcquisitionMode::ScanShift),
            2 => Ok(AcquisitionMode::ScanScreen),
            3 => Ok(AcquisitionMode::Record),
            4 => Ok(AcquisitionMode::Overs),
            5 => Ok(AcquisitionMode::Single1),
            other => Err(HardwareFault::UnknownAcquisitionMode(other)),
        }
    }
}

/// Configuration of one acquisition session, immutable once the session is started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    pub channels: Vec<ChannelId>,
    pub sample_rate: Frequency,
    /// Total number of samples per channel to record, unbounded when absent or zero
    #[serde(default)]
    pub target_samples: Option<u64>,
    /// Input range applied to every requested channel
    pub range: ElectricPotential,
    #[serde(default)]
    pub mode: AcquisitionMode,
}

impl Default for AcquisitionRequest {
    fn default() -> Self {
        Self::record(
            vec![ChannelId::new(0), ChannelId::new(1)],
            Frequency::new::<hertz>(1000.0),
            ElectricPotential::new::<volt>(5.0),
        )
    }
}

impl AcquisitionRequest {
    /// Continuous Record mode acquisition without a sample target
    pub fn record(channels: Vec<ChannelId>, sample_rate: Frequency, range: ElectricPotential) -> Self {
        Self {
            channels,
            sample_rate,
            target_samples: None,
            range,
            mode: AcquisitionMode::Record,
        }
    }

    pub fn with_target_samples(mut self, target_samples: u64) -> Self {
        self.target_samples = Some(target_samples);
        self
    }

    pub fn with_mode(mut self, mode: AcquisitionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Record length register value for this request
    pub fn record_length(&self) -> RecordLength {
        match self.target_samples {
            None | Some(0) => RecordLength::Unbounded,
            // TODO: confirm against the WaveForms SDK reference whether this should be target / rate,
            // the register is documented in seconds
            Some(target) => RecordLength::Finite(Time::new::<second>(
                self.sample_rate.get::<hertz>() / target as f64,
            )),
        }
    }

    /// Check the request against a device with `capacity` analog input channels
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigurationError> {
        if self.mode != AcquisitionMode::Record {
            return Err(ConfigurationError::UnsupportedMode(self.mode));
        }

        if self.channels.is_empty() {
            return Err(ConfigurationError::EmptyChannelSet);
        }

        let rate = self.sample_rate.get::<hertz>();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigurationError::InvalidSampleRate(rate));
        }

        let mut seen = HashSet::with_capacity(self.channels.len());
        for &channel in &self.channels {
            if channel.index() >= capacity {
                return Err(ConfigurationError::InvalidChannel {
                    channel: channel.into(),
                    capacity: Some(capacity),
                });
            }
            if !seen.insert(channel) {
                return Err(ConfigurationError::DuplicateChannel(channel));
            }
        }

        Ok(())
    }
}
