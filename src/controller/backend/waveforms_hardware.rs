use std::fmt::Debug;

use thiserror::Error;
use uom::si::f64::{ElectricPotential, Frequency, Time};

use crate::controller::request::{AcquisitionMode, ChannelId, ChannelSettings};

/// Requested duration of a Record mode acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordLength {
    /// Record until the session is stopped
    Unbounded,
    Finite(Time),
}

/// Failure reported by, or detected at, the hardware boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareFault {
    #[error("{call} failed with WaveForms error code {code}: {message}")]
    Sdk {
        call: &'static str,
        code: i32,
        message: String,
    },

    #[error("instrument reported unknown status code {0}")]
    UnknownInstrumentState(u8),

    #[error("instrument reported unknown acquisition mode code {0}")]
    UnknownAcquisitionMode(i32),

    #[error(
        "instrument reported an invalid record status (available {available}, lost {lost}, corrupted {corrupted})"
    )]
    InvalidRecordStatus {
        available: i32,
        lost: i32,
        corrupted: i32,
    },

    #[error("a device with serial number {0} is not available")]
    DeviceNotFound(String),

    #[error("device disconnected: {0}")]
    Disconnected(String),
}

/// Synchronous analog input register interface of a WaveForms instrument.
///
/// Every call blocks until the instrument answers. Implementations own exactly one device handle,
/// callers must not use one implementation from several threads at once.
pub trait WaveformsHardware: Debug {
    /// Number of analog input channels on the device
    fn analog_in_channel_count(&mut self) -> Result<usize, HardwareFault>;

    /// When disabled, settings are only applied by [`WaveformsHardware::configure`]
    fn set_auto_configure(&mut self, enabled: bool) -> Result<(), HardwareFault>;

    fn set_channel_enabled(&mut self, channel: ChannelId, enabled: bool)
    -> Result<(), HardwareFault>;

    fn set_channel_range(
        &mut self,
        channel: ChannelId,
        range: ElectricPotential,
    ) -> Result<(), HardwareFault>;

    /// Selectable peak to peak input ranges, ascending
    fn range_steps(&mut self) -> Result<Vec<ElectricPotential>, HardwareFault>;

    fn set_sample_rate(&mut self, rate: Frequency) -> Result<(), HardwareFault>;

    /// Supported (min, max) sample rate
    fn sample_rate_info(&mut self) -> Result<(Frequency, Frequency), HardwareFault>;

    fn set_record_length(&mut self, length: RecordLength) -> Result<(), HardwareFault>;

    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), HardwareFault>;

    /// Raw acquisition mode code currently configured on the instrument
    fn acquisition_mode(&mut self) -> Result<i32, HardwareFault>;

    /// Apply pending settings and optionally arm/start the acquisition
    fn configure(&mut self, reset_trigger: bool, start: bool) -> Result<(), HardwareFault>;

    /// Raw instrument status byte, optionally fetching new data from the device
    fn status(&mut self, read_data: bool) -> Result<u8, HardwareFault>;

    /// Raw (available, lost, corrupted) counts of the latest status read
    fn record_status(&mut self) -> Result<(i32, i32, i32), HardwareFault>;

    /// Fill `buffer` with the next `buffer.len()` samples of `channel`
    fn status_data(&mut self, channel: ChannelId, buffer: &mut [f64])
    -> Result<(), HardwareFault>;

    fn set_channels_enabled(
        &mut self,
        settings: &ChannelSettings<bool>,
    ) -> Result<(), HardwareFault> {
        for &(channel, enabled) in settings.iter() {
            self.set_channel_enabled(channel, enabled)?;
        }
        Ok(())
    }

    fn set_input_ranges(
        &mut self,
        settings: &ChannelSettings<ElectricPotential>,
    ) -> Result<(), HardwareFault> {
        for &(channel, range) in settings.iter() {
            self.set_channel_range(channel, range)?;
        }
        Ok(())
    }
}
