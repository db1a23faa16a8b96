//! Simulated WaveForms instrument.
//!
//! The device either replays a script of poll cycles, which makes the acquisition logic
//! deterministic in tests, or generates noisy sine waves in real time for the host shell.
//! Every register access is recorded so tests can assert on the exact calls issued.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::time::Instant;

use rand::random_range;
use tracing::{debug, info};
use uom::si::{
    electric_potential::volt,
    f64::{ElectricPotential, Frequency},
    frequency::hertz,
};

use crate::controller::backend::waveforms_hardware::{HardwareFault, RecordLength, WaveformsHardware};
use crate::controller::request::{AcquisitionMode, ChannelId};
use crate::controller::status::InstrumentState;
use crate::device::{DeviceEnumerator, DeviceInfo, DeviceType};

/// Samples per channel the simulated instrument buffers between polls, the excess is lost
const SIM_BUFFER_SAMPLES: u64 = 8192;
const SIM_MIN_SAMPLE_RATE_HZ: f64 = 1.0;
const SIM_MAX_SAMPLE_RATE_HZ: f64 = 100e6;
/// Peak to peak input ranges offered by the simulated front end
const SIM_RANGE_STEPS_V: [f64; 4] = [0.5, 5.0, 10.0, 50.0];
/// WaveForms "invalid parameter" error code
const INVALID_PARAMETER: i32 = 0x10;

/// What one status read of a scripted device reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCycle {
    pub state: u8,
    pub available: i32,
    pub lost: i32,
    pub corrupted: i32,
}

impl SimCycle {
    pub fn running(available: i32) -> Self {
        Self {
            state: InstrumentState::Running.code(),
            available,
            lost: 0,
            corrupted: 0,
        }
    }

    pub fn in_state(state: InstrumentState) -> Self {
        Self::raw_state(state.code())
    }

    pub fn raw_state(state: u8) -> Self {
        Self {
            state,
            available: 0,
            lost: 0,
            corrupted: 0,
        }
    }

    pub fn with_lost(mut self, lost: i32) -> Self {
        self.lost = lost;
        self
    }

    pub fn with_corrupted(mut self, corrupted: i32) -> Self {
        self.corrupted = corrupted;
        self
    }
}

/// A register access made on the simulated device
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    ChannelCount,
    AutoConfigure(bool),
    ChannelEnable(ChannelId, bool),
    ChannelRange(ChannelId, f64),
    RangeSteps,
    SampleRate(f64),
    SampleRateInfo,
    RecordLength(RecordLength),
    SetAcquisitionMode(AcquisitionMode),
    GetAcquisitionMode,
    Configure { reset_trigger: bool, start: bool },
    Status,
    RecordStatus,
    StatusData { channel: ChannelId, count: usize },
}

#[derive(Debug)]
enum SimSource {
    Scripted {
        cycles: VecDeque<SimCycle>,
        /// Reported once the script is exhausted
        idle: SimCycle,
    },
    Generated {
        signal_hz: f64,
        started: Option<Instant>,
        due_total: u64,
    },
}

#[derive(Debug)]
pub struct SimDevice {
    capacity: usize,
    source: SimSource,
    enabled: Vec<bool>,
    ranges: Vec<f64>,
    sample_rate: f64,
    record_length: Option<RecordLength>,
    mode: i32,
    auto_configure: bool,
    running: bool,
    current: SimCycle,
    readable: usize,
    emitted: Vec<u64>,
    calls: Vec<SimCall>,
    pending_fault: Option<HardwareFault>,
}

impl SimDevice {
    fn with_source(capacity: usize, source: SimSource) -> Self {
        Self {
            capacity,
            source,
            enabled: vec![false; capacity],
            ranges: vec![5.0; capacity],
            sample_rate: 0.0,
            record_length: None,
            mode: AcquisitionMode::Single.code(),
            auto_configure: true,
            running: false,
            current: SimCycle::in_state(InstrumentState::Ready),
            readable: 0,
            emitted: vec![0; capacity],
            calls: Vec::new(),
            pending_fault: None,
        }
    }

    /// Replays `cycles`, one per status read, then reports a running instrument without data.
    /// Sample `n` of every channel has the value `n`.
    pub fn scripted(capacity: usize, cycles: impl IntoIterator<Item = SimCycle>) -> Self {
        Self::with_source(
            capacity,
            SimSource::Scripted {
                cycles: cycles.into_iter().collect(),
                idle: SimCycle::running(0),
            },
        )
    }

    /// Produces noisy sines of `signal_hz` at the configured sample rate, in real time
    pub fn generated(capacity: usize, signal_hz: f64) -> Self {
        Self::with_source(
            capacity,
            SimSource::Generated {
                signal_hz,
                started: None,
                due_total: 0,
            },
        )
    }

    pub fn push_cycles(&mut self, more: impl IntoIterator<Item = SimCycle>) {
        if let SimSource::Scripted { cycles, .. } = &mut self.source {
            cycles.extend(more);
        }
    }

    /// Fail the next register access with `fault`
    pub fn inject_fault(&mut self, fault: HardwareFault) {
        self.pending_fault = Some(fault);
    }

    /// Change the acquisition mode behind the controller's back
    pub fn force_acquisition_mode(&mut self, code: i32) {
        self.mode = code;
    }

    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn status_queries(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SimCall::Status))
            .count()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn auto_configure(&self) -> bool {
        self.auto_configure
    }

    pub fn channel_enabled(&self, channel: ChannelId) -> bool {
        self.enabled.get(channel.index()).copied().unwrap_or(false)
    }

    pub fn channel_range(&self, channel: ChannelId) -> Option<ElectricPotential> {
        self.ranges
            .get(channel.index())
            .map(|range| ElectricPotential::new::<volt>(*range))
    }

    pub fn sample_rate(&self) -> Frequency {
        Frequency::new::<hertz>(self.sample_rate)
    }

    pub fn record_length(&self) -> Option<RecordLength> {
        self.record_length
    }

    fn log(&mut self, call: SimCall) -> Result<(), HardwareFault> {
        debug!("sim register access: {:?}", call);
        self.calls.push(call);
        match self.pending_fault.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn check_channel(&self, call: &'static str, channel: ChannelId) -> Result<(), HardwareFault> {
        if channel.index() >= self.capacity {
            return Err(HardwareFault::Sdk {
                call,
                code: INVALID_PARAMETER,
                message: format!("channel {channel} does not exist"),
            });
        }
        Ok(())
    }

    fn next_cycle(&mut self) -> SimCycle {
        match &mut self.source {
            SimSource::Scripted { cycles, idle } => cycles.pop_front().unwrap_or(*idle),
            SimSource::Generated {
                started,
                due_total,
                ..
            } => {
                let Some(started_at) = *started else {
                    *started = Some(Instant::now());
                    return SimCycle::in_state(InstrumentState::Armed);
                };

                let due = (started_at.elapsed().as_secs_f64() * self.sample_rate) as u64;
                let pending = due.saturating_sub(*due_total);
                *due_total = due;
                generated_cycle(pending)
            }
        }
    }

    fn sample(&self, channel: usize, n: u64) -> f64 {
        match self.source {
            SimSource::Scripted { .. } => n as f64,
            SimSource::Generated { signal_hz, .. } => {
                let t = n as f64 / self.sample_rate;
                let phase = channel as f64 * TAU / self.capacity.max(1) as f64;
                let amplitude = self.ranges[channel] / 4.0;
                amplitude * (TAU * signal_hz * t + phase).sin() + random_range(-0.01..=0.01)
            }
        }
    }
}

/// Samples beyond the instrument buffer are reported as lost, saturating at the register width
fn generated_cycle(pending: u64) -> SimCycle {
    let available = pending.min(SIM_BUFFER_SAMPLES);
    let lost = i32::try_from(pending - available).unwrap_or(i32::MAX);
    SimCycle::running(available as i32).with_lost(lost)
}

impl WaveformsHardware for SimDevice {
    fn analog_in_channel_count(&mut self) -> Result<usize, HardwareFault> {
        self.log(SimCall::ChannelCount)?;
        Ok(self.capacity)
    }

    fn set_auto_configure(&mut self, enabled: bool) -> Result<(), HardwareFault> {
        self.log(SimCall::AutoConfigure(enabled))?;
        self.auto_configure = enabled;
        Ok(())
    }

    fn set_channel_enabled(
        &mut self,
        channel: ChannelId,
        enabled: bool,
    ) -> Result<(), HardwareFault> {
        self.log(SimCall::ChannelEnable(channel, enabled))?;
        self.check_channel("FDwfAnalogInChannelEnableSet", channel)?;
        self.enabled[channel.index()] = enabled;
        Ok(())
    }

    fn set_channel_range(
        &mut self,
        channel: ChannelId,
        range: ElectricPotential,
    ) -> Result<(), HardwareFault> {
        let volts = range.get::<volt>();
        self.log(SimCall::ChannelRange(channel, volts))?;
        self.check_channel("FDwfAnalogInChannelRangeSet", channel)?;
        self.ranges[channel.index()] = volts;
        Ok(())
    }

    fn range_steps(&mut self) -> Result<Vec<ElectricPotential>, HardwareFault> {
        self.log(SimCall::RangeSteps)?;
        Ok(SIM_RANGE_STEPS_V
            .iter()
            .map(|volts| ElectricPotential::new::<volt>(*volts))
            .collect())
    }

    fn set_sample_rate(&mut self, rate: Frequency) -> Result<(), HardwareFault> {
        let hz = rate.get::<hertz>();
        self.log(SimCall::SampleRate(hz))?;
        self.sample_rate = hz.clamp(SIM_MIN_SAMPLE_RATE_HZ, SIM_MAX_SAMPLE_RATE_HZ);
        Ok(())
    }

    fn sample_rate_info(&mut self) -> Result<(Frequency, Frequency), HardwareFault> {
        self.log(SimCall::SampleRateInfo)?;
        Ok((
            Frequency::new::<hertz>(SIM_MIN_SAMPLE_RATE_HZ),
            Frequency::new::<hertz>(SIM_MAX_SAMPLE_RATE_HZ),
        ))
    }

    fn set_record_length(&mut self, length: RecordLength) -> Result<(), HardwareFault> {
        self.log(SimCall::RecordLength(length))?;
        self.record_length = Some(length);
        Ok(())
    }

    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), HardwareFault> {
        self.log(SimCall::SetAcquisitionMode(mode))?;
        self.mode = mode.code();
        Ok(())
    }

    fn acquisition_mode(&mut self) -> Result<i32, HardwareFault> {
        self.log(SimCall::GetAcquisitionMode)?;
        Ok(self.mode)
    }

    fn configure(&mut self, reset_trigger: bool, start: bool) -> Result<(), HardwareFault> {
        self.log(SimCall::Configure {
            reset_trigger,
            start,
        })?;

        if start {
            info!(
                "Simulated instrument starting at {} S/s on channels {:?}",
                self.sample_rate,
                (0..self.capacity)
                    .filter(|index| self.enabled[*index])
                    .collect::<Vec<_>>()
            );
            self.running = true;
            self.readable = 0;
            self.emitted.iter_mut().for_each(|emitted| *emitted = 0);
            if let SimSource::Generated {
                started, due_total, ..
            } = &mut self.source
            {
                *started = None;
                *due_total = 0;
            }
        }
        Ok(())
    }

    fn status(&mut self, read_data: bool) -> Result<u8, HardwareFault> {
        self.log(SimCall::Status)?;

        if !self.running {
            self.current = SimCycle::in_state(InstrumentState::Ready);
        } else if read_data {
            self.current = self.next_cycle();
        }
        self.readable = self.current.available.max(0) as usize;
        Ok(self.current.state)
    }

    fn record_status(&mut self) -> Result<(i32, i32, i32), HardwareFault> {
        self.log(SimCall::RecordStatus)?;
        Ok((
            self.current.available,
            self.current.lost,
            self.current.corrupted,
        ))
    }

    fn status_data(
        &mut self,
        channel: ChannelId,
        buffer: &mut [f64],
    ) -> Result<(), HardwareFault> {
        self.log(SimCall::StatusData {
            channel,
            count: buffer.len(),
        })?;
        self.check_channel("FDwfAnalogInStatusData", channel)?;

        if !self.enabled[channel.index()] {
            return Err(HardwareFault::Sdk {
                call: "FDwfAnalogInStatusData",
                code: INVALID_PARAMETER,
                message: format!("channel {channel} is not enabled"),
            });
        }
        if buffer.len() > self.readable {
            return Err(HardwareFault::Sdk {
                call: "FDwfAnalogInStatusData",
                code: INVALID_PARAMETER,
                message: format!(
                    "requested {} samples but only {} are buffered",
                    buffer.len(),
                    self.readable
                ),
            });
        }

        let index = channel.index();
        let first = self.emitted[index];
        for (offset, sample) in buffer.iter_mut().enumerate() {
            *sample = self.sample(index, first + offset as u64);
        }
        self.emitted[index] += buffer.len() as u64;
        Ok(())
    }
}

/// Lists a fixed set of simulated instruments
#[derive(Debug, Clone)]
pub struct SimEnumerator {
    devices: Vec<(DeviceInfo, usize)>,
    open: Vec<usize>,
}

impl Default for SimEnumerator {
    fn default() -> Self {
        Self::new(vec![
            (
                DeviceInfo {
                    index: 0,
                    device_type: DeviceType::AnalogDiscovery2,
                    name: "Analog Discovery 2".to_string(),
                    serial_number: "SN:210321ABC001".to_string(),
                    revision: 1,
                },
                2,
            ),
            (
                DeviceInfo {
                    index: 1,
                    device_type: DeviceType::AnalogDiscoveryPro3x50,
                    name: "Analog Discovery Pro 3450".to_string(),
                    serial_number: "SN:210018ABC002".to_string(),
                    revision: 3,
                },
                4,
            ),
        ])
    }
}

impl SimEnumerator {
    /// Devices with their analog input channel count
    pub fn new(devices: Vec<(DeviceInfo, usize)>) -> Self {
        Self {
            devices,
            open: Vec::new(),
        }
    }

    pub fn open_devices(&self) -> &[usize] {
        &self.open
    }
}

impl DeviceEnumerator for SimEnumerator {
    type Device = SimDevice;

    fn devices(&mut self) -> Result<Vec<DeviceInfo>, HardwareFault> {
        Ok(self.devices.iter().map(|(info, _)| info.clone()).collect())
    }

    fn open(&mut self, index: usize) -> Result<SimDevice, HardwareFault> {
        let Some((_, capacity)) = self.devices.iter().find(|(info, _)| info.index == index) else {
            return Err(HardwareFault::Sdk {
                call: "FDwfDeviceOpen",
                code: INVALID_PARAMETER,
                message: format!("no device at index {index}"),
            });
        };

        self.open.push(index);
        Ok(SimDevice::generated(*capacity, 50.0))
    }

    fn close_all(&mut self) -> Result<(), HardwareFault> {
        self.open.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_device_replays_cycles_then_idles() {
        let mut sim = SimDevice::scripted(2, [SimCycle::running(3).with_lost(1)]);
        assert_eq!(sim.status(true), Ok(InstrumentState::Ready.code()));

        sim.set_channel_enabled(ChannelId::new(1), true).unwrap();
        sim.configure(true, true).unwrap();

        assert_eq!(sim.status(true), Ok(InstrumentState::Running.code()));
        assert_eq!(sim.record_status(), Ok((3, 1, 0)));

        let mut buffer = [0.0; 3];
        sim.status_data(ChannelId::new(1), &mut buffer).unwrap();
        assert_eq!(buffer, [0.0, 1.0, 2.0]);

        assert_eq!(sim.status(true), Ok(InstrumentState::Running.code()));
        assert_eq!(sim.record_status(), Ok((0, 0, 0)));
        assert!(sim.status_data(ChannelId::new(1), &mut buffer).is_err());
    }

    #[test]
    fn disabled_channel_cannot_be_read() {
        let mut sim = SimDevice::scripted(2, [SimCycle::running(1)]);
        sim.configure(true, true).unwrap();
        sim.status(true).unwrap();

        let mut buffer = [0.0; 1];
        assert!(sim.status_data(ChannelId::new(0), &mut buffer).is_err());
    }

    #[test]
    fn injected_fault_fails_next_call_only() {
        let mut sim = SimDevice::scripted(2, []);
        sim.inject_fault(HardwareFault::Disconnected("cable".into()));

        assert_eq!(
            sim.analog_in_channel_count(),
            Err(HardwareFault::Disconnected("cable".into()))
        );
        assert_eq!(sim.analog_in_channel_count(), Ok(2));
    }

    #[test]
    fn generated_overflow_saturates_lost_count() {
        assert_eq!(generated_cycle(100), SimCycle::running(100));
        assert_eq!(
            generated_cycle(SIM_BUFFER_SAMPLES + 5),
            SimCycle::running(SIM_BUFFER_SAMPLES as i32).with_lost(5)
        );
        assert_eq!(
            generated_cycle(u64::MAX),
            SimCycle::running(SIM_BUFFER_SAMPLES as i32).with_lost(i32::MAX)
        );
    }

    #[test]
    fn range_steps_are_ascending() {
        let mut sim = SimDevice::scripted(2, []);
        let steps = sim.range_steps().unwrap();
        assert_eq!(steps.len(), SIM_RANGE_STEPS_V.len());
        assert!(steps.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(sim.calls(), &[SimCall::RangeSteps]);
    }

    #[test]
    fn enumerator_opens_listed_devices() {
        let mut enumerator = SimEnumerator::default();
        let devices = enumerator.devices().unwrap();
        assert_eq!(devices.len(), 2);

        let mut device = enumerator.open(1).unwrap();
        assert_eq!(device.analog_in_channel_count(), Ok(4));
        assert_eq!(enumerator.open_devices(), &[1]);
        assert!(enumerator.open(5).is_err());
    }
}
