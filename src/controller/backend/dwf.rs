use std::os::raw::{c_double, c_int};

use tracing::info;
use uom::si::{
    electric_potential::volt,
    f64::{ElectricPotential, Frequency},
    frequency::hertz,
    time::second,
};

use crate::controller::request::{AcquisitionMode, ChannelId};
use crate::device::{DeviceEnumerator, DeviceInfo};
use crate::dwf::bindings::*;
use crate::dwf::dwf_sys::{self, DeviceHandle, as_c_int, check};

use super::waveforms_hardware::{HardwareFault, RecordLength, WaveformsHardware};

/// Record length register value meaning "record until stopped"
const UNBOUNDED_RECORD_LENGTH_SECONDS: f64 = -1.0;

/// A WaveForms instrument reached through the vendor SDK
#[derive(Debug)]
pub struct DwfDevice {
    handle: DeviceHandle,
}

impl DwfDevice {
    pub fn open(index: usize) -> Result<Self, HardwareFault> {
        let handle = DeviceHandle::open(index)?;
        info!("Opened WaveForms device {} with handle {}", index, handle.raw());
        Ok(Self { handle })
    }

    fn hdwf(&self) -> HDWF {
        self.handle.raw()
    }
}

fn channel_index(channel: ChannelId) -> c_int {
    channel.index() as c_int
}

fn record_length_seconds(length: RecordLength) -> c_double {
    match length {
        RecordLength::Unbounded => UNBOUNDED_RECORD_LENGTH_SECONDS,
        RecordLength::Finite(length) => length.get::<second>(),
    }
}

impl WaveformsHardware for DwfDevice {
    fn analog_in_channel_count(&mut self) -> Result<usize, HardwareFault> {
        let mut count: c_int = 0;
        unsafe {
            check(
                "FDwfAnalogInChannelCount",
                FDwfAnalogInChannelCount(self.hdwf(), &mut count),
            )?;
        }
        Ok(count.max(0) as usize)
    }

    fn set_auto_configure(&mut self, enabled: bool) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfDeviceAutoConfigureSet",
                FDwfDeviceAutoConfigureSet(self.hdwf(), enabled as c_int),
            )
        }
    }

    fn set_channel_enabled(
        &mut self,
        channel: ChannelId,
        enabled: bool,
    ) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInChannelEnableSet",
                FDwfAnalogInChannelEnableSet(self.hdwf(), channel_index(channel), enabled as c_int),
            )
        }
    }

    fn set_channel_range(
        &mut self,
        channel: ChannelId,
        range: ElectricPotential,
    ) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInChannelRangeSet",
                FDwfAnalogInChannelRangeSet(
                    self.hdwf(),
                    channel_index(channel),
                    range.get::<volt>(),
                ),
            )
        }
    }

    fn range_steps(&mut self) -> Result<Vec<ElectricPotential>, HardwareFault> {
        let mut steps: [c_double; RANGE_STEPS_LEN] = [0.0; RANGE_STEPS_LEN];
        let mut count: c_int = 0;
        unsafe {
            check(
                "FDwfAnalogInChannelRangeSteps",
                FDwfAnalogInChannelRangeSteps(self.hdwf(), steps.as_mut_ptr(), &mut count),
            )?;
        }

        let count = (count.max(0) as usize).min(RANGE_STEPS_LEN);
        let mut ranges: Vec<ElectricPotential> = steps[..count]
            .iter()
            .map(|volts| ElectricPotential::new::<volt>(*volts))
            .collect();
        ranges.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(ranges)
    }

    fn set_sample_rate(&mut self, rate: Frequency) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInFrequencySet",
                FDwfAnalogInFrequencySet(self.hdwf(), rate.get::<hertz>()),
            )
        }
    }

    fn sample_rate_info(&mut self) -> Result<(Frequency, Frequency), HardwareFault> {
        let mut min: c_double = 0.0;
        let mut max: c_double = 0.0;
        unsafe {
            check(
                "FDwfAnalogInFrequencyInfo",
                FDwfAnalogInFrequencyInfo(self.hdwf(), &mut min, &mut max),
            )?;
        }
        Ok((Frequency::new::<hertz>(min), Frequency::new::<hertz>(max)))
    }

    fn set_record_length(&mut self, length: RecordLength) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInRecordLengthSet",
                FDwfAnalogInRecordLengthSet(self.hdwf(), record_length_seconds(length)),
            )
        }
    }

    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInAcquisitionModeSet",
                FDwfAnalogInAcquisitionModeSet(self.hdwf(), mode.code()),
            )
        }
    }

    fn acquisition_mode(&mut self) -> Result<i32, HardwareFault> {
        let mut mode: ACQMODE = 0;
        unsafe {
            check(
                "FDwfAnalogInAcquisitionModeGet",
                FDwfAnalogInAcquisitionModeGet(self.hdwf(), &mut mode),
            )?;
        }
        Ok(mode)
    }

    fn configure(&mut self, reset_trigger: bool, start: bool) -> Result<(), HardwareFault> {
        unsafe {
            check(
                "FDwfAnalogInConfigure",
                FDwfAnalogInConfigure(self.hdwf(), reset_trigger as c_int, start as c_int),
            )
        }
    }

    fn status(&mut self, read_data: bool) -> Result<u8, HardwareFault> {
        let mut state: STS = 0;
        unsafe {
            check(
                "FDwfAnalogInStatus",
                FDwfAnalogInStatus(self.hdwf(), read_data as c_int, &mut state),
            )?;
        }
        Ok(state)
    }

    fn record_status(&mut self) -> Result<(i32, i32, i32), HardwareFault> {
        let (mut available, mut lost, mut corrupted): (c_int, c_int, c_int) = (0, 0, 0);
        unsafe {
            check(
                "FDwfAnalogInStatusRecord",
                FDwfAnalogInStatusRecord(self.hdwf(), &mut available, &mut lost, &mut corrupted),
            )?;
        }
        Ok((available, lost, corrupted))
    }

    fn status_data(
        &mut self,
        channel: ChannelId,
        buffer: &mut [f64],
    ) -> Result<(), HardwareFault> {
        let count = as_c_int(buffer.len())?;
        unsafe {
            check(
                "FDwfAnalogInStatusData",
                FDwfAnalogInStatusData(
                    self.hdwf(),
                    channel_index(channel),
                    buffer.as_mut_ptr(),
                    count,
                ),
            )
        }
    }
}

/// Enumerates instruments connected to this machine through the SDK
#[derive(Debug, Default)]
pub struct DwfEnumerator;

impl DeviceEnumerator for DwfEnumerator {
    type Device = DwfDevice;

    fn devices(&mut self) -> Result<Vec<DeviceInfo>, HardwareFault> {
        dwf_sys::enumerate_devices()
    }

    fn open(&mut self, index: usize) -> Result<DwfDevice, HardwareFault> {
        DwfDevice::open(index)
    }

    fn close_all(&mut self) -> Result<(), HardwareFault> {
        dwf_sys::close_all()
    }
}

#[cfg(test)]
mod tests {
    use uom::si::f64::Time;

    use super::*;

    #[test]
    fn unbounded_record_length_is_written_as_minus_one() {
        assert_eq!(record_length_seconds(RecordLength::Unbounded), -1.0);
        assert_eq!(
            record_length_seconds(RecordLength::Finite(Time::new::<second>(2.5))),
            2.5
        );
    }
}
