use std::time::Duration;

use tracing::{debug, info, warn};
use uom::si::{
    f64::{ElectricPotential, Frequency},
    frequency::hertz,
};

use crate::controller::backend::waveforms_hardware::{HardwareFault, WaveformsHardware};
use crate::controller::buffers::ChannelBuffers;
use crate::controller::clock::{Clock, SystemClock};
use crate::controller::request::{AcquisitionMode, AcquisitionRequest, ChannelId, ChannelSettings};
use crate::controller::tracker::AcquisitionTracker;
use crate::error::{AcquisitionError, ConfigurationError};

pub mod backend;
pub mod buffers;
pub mod clock;
pub mod fetch;
pub mod request;
pub mod status;
pub mod tracker;

/// Pause between poll cycles of a blocking read
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Configuring,
    Armed,
    Streaming,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    /// Samples fetched in this cycle only
    pub samples: ChannelBuffers,
    /// Session totals
    pub lost: u64,
    pub corrupted: u64,
}

impl PollResult {
    fn empty(channels: &[ChannelId], tracker: &AcquisitionTracker) -> Self {
        Self {
            samples: ChannelBuffers::new(channels),
            lost: tracker.lost_count(),
            corrupted: tracker.corrupted_count(),
        }
    }

    /// Samples per channel fetched in this cycle
    pub fn sample_count(&self) -> usize {
        self.samples.first_len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Outcome of [`AcquisitionController::read_blocking`]
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingRead {
    pub buffers: ChannelBuffers,
    pub lost: u64,
    pub corrupted: u64,
}

/// Drives Record mode analog input acquisition on one device.
///
/// The controller owns the hardware handle and is driven entirely by its caller: either
/// [`AcquisitionController::poll`] once per host cycle, or [`AcquisitionController::read_blocking`]
/// which polls on its own until enough samples arrived.
#[derive(Debug)]
pub struct AcquisitionController<H, C = SystemClock> {
    hardware: H,
    clock: C,
    poll_interval: Duration,
    channel_capacity: usize,
    state: ControllerState,
    request: Option<AcquisitionRequest>,
    tracker: AcquisitionTracker,
    buffers: ChannelBuffers,
}

impl<H: WaveformsHardware> AcquisitionController<H, SystemClock> {
    pub fn new(hardware: H) -> Result<Self, HardwareFault> {
        Self::with_clock(hardware, SystemClock::default())
    }
}

impl<H: WaveformsHardware, C: Clock> AcquisitionController<H, C> {
    /// Take ownership of an opened device, settings will only be applied when arming
    pub fn with_clock(mut hardware: H, clock: C) -> Result<Self, HardwareFault> {
        let channel_capacity = hardware.analog_in_channel_count()?;
        hardware.set_auto_configure(false)?;
        info!(
            "Acquisition controller ready, device has {} analog input channels",
            channel_capacity
        );

        Ok(Self {
            hardware,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity,
            state: ControllerState::Idle,
            request: None,
            tracker: AcquisitionTracker::default(),
            buffers: ChannelBuffers::default(),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Configure the device for `request` and start recording
    pub fn start(&mut self, request: AcquisitionRequest) -> Result<(), AcquisitionError> {
        request.validate(self.channel_capacity)?;

        info!(
            "Starting Record acquisition on channels {:?} at {} S/s",
            request.channels,
            request.sample_rate.get::<hertz>()
        );
        self.state = ControllerState::Configuring;
        self.request = None;
        self.tracker.start_session(request.target_samples);
        self.buffers = ChannelBuffers::new(&request.channels);

        if let Err(fault) = self.configure(&request) {
            self.state = ControllerState::Idle;
            return Err(fault.into());
        }

        self.request = Some(request);
        self.state = ControllerState::Armed;
        Ok(())
    }

    fn configure(&mut self, request: &AcquisitionRequest) -> Result<(), HardwareFault> {
        self.hardware
            .set_channels_enabled(&ChannelSettings::uniform(&request.channels, true))?;
        self.hardware
            .set_input_ranges(&ChannelSettings::uniform(&request.channels, request.range))?;
        self.hardware.set_acquisition_mode(AcquisitionMode::Record)?;
        self.hardware.set_sample_rate(request.sample_rate)?;
        self.hardware.set_record_length(request.record_length())?;
        self.hardware.configure(true, true)
    }

    /// One non-blocking poll cycle: fetch whatever the instrument has buffered
    pub fn poll(&mut self) -> Result<PollResult, AcquisitionError> {
        let Some(request) = self.request.as_ref() else {
            return Err(ConfigurationError::NotStarted.into());
        };

        let mode = status::get_acquisition_mode(&mut self.hardware)?;
        if mode != AcquisitionMode::Record {
            return Err(ConfigurationError::UnsupportedMode(mode).into());
        }

        let state = status::get_state(&mut self.hardware)?;
        if !self.tracker.has_delivered() && state.is_pre_run() {
            debug!("Acquisition has not started yet, instrument is {:?}", state);
            return Ok(PollResult::empty(&request.channels, &self.tracker));
        }

        let record = status::get_record_status(&mut self.hardware)?;
        self.tracker.accumulate(record.lost, record.corrupted);
        self.state = ControllerState::Streaming;

        if record.lost > 0 || record.corrupted > 0 {
            warn!(
                "Instrument reported {} lost and {} corrupted samples this cycle ({} lost, {} corrupted in total)",
                record.lost,
                record.corrupted,
                self.tracker.lost_count(),
                self.tracker.corrupted_count()
            );
        }

        let available = record.available;
        if available.count() == 0 {
            return Ok(PollResult::empty(&request.channels, &self.tracker));
        }

        let samples = fetch::read_channels(&mut self.hardware, &request.channels, available)?;
        self.buffers.extend_from(&samples);
        self.tracker.record_delivered(available.count() as u64);
        debug!(
            "Fetched {} samples per channel, {} delivered this session",
            available.count(),
            self.tracker.sample_count()
        );

        Ok(PollResult {
            samples,
            lost: self.tracker.lost_count(),
            corrupted: self.tracker.corrupted_count(),
        })
    }

    /// Poll until `target_count` samples per channel arrived or `timeout` passed
    pub fn read_blocking(
        &mut self,
        channels: &[ChannelId],
        target_count: usize,
        timeout: Duration,
    ) -> Result<BlockingRead, AcquisitionError> {
        let mut accumulated = ChannelBuffers::new(channels);
        if target_count == 0 {
            return Ok(BlockingRead {
                buffers: accumulated,
                lost: self.tracker.lost_count(),
                corrupted: self.tracker.corrupted_count(),
            });
        }

        let Some(request) = self.request.as_ref() else {
            return Err(ConfigurationError::NotStarted.into());
        };
        if request.channels != channels {
            return Err(ConfigurationError::ChannelSetMismatch {
                requested: channels.to_vec(),
                session: request.channels.clone(),
            }
            .into());
        }

        let started = self.clock.now();
        // No deadline when the timeout runs past the clock's range
        let deadline = started.checked_add(timeout);
        let mut obtained = 0;

        while obtained < target_count {
            let now = self.clock.now();
            if deadline.is_some_and(|deadline| now > deadline) {
                return Err(AcquisitionError::Timeout {
                    obtained,
                    requested: target_count,
                    elapsed: now - started,
                });
            }

            let cycle = self.poll()?;
            obtained += cycle.sample_count();
            accumulated.extend_from(&cycle.samples);

            if obtained < target_count {
                self.clock.sleep(self.poll_interval);
            }
        }

        Ok(BlockingRead {
            buffers: accumulated,
            lost: self.tracker.lost_count(),
            corrupted: self.tracker.corrupted_count(),
        })
    }

    /// End the session, buffered samples stay available for draining
    pub fn stop(&mut self) {
        if self.state != ControllerState::Idle {
            info!(
                "Stopping acquisition after {} samples per channel ({} lost, {} corrupted)",
                self.tracker.sample_count(),
                self.tracker.lost_count(),
                self.tracker.corrupted_count()
            );
        }
        self.state = ControllerState::Idle;
        self.request = None;
    }

    /// Supported (min, max) sample rate of the device
    pub fn sample_rate_limits(&mut self) -> Result<(Frequency, Frequency), HardwareFault> {
        self.hardware.sample_rate_info()
    }

    /// Selectable peak to peak input ranges of the device, ascending
    pub fn range_steps(&mut self) -> Result<Vec<ElectricPotential>, HardwareFault> {
        self.hardware.range_steps()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn request(&self) -> Option<&AcquisitionRequest> {
        self.request.as_ref()
    }

    pub fn tracker(&self) -> &AcquisitionTracker {
        &self.tracker
    }

    /// Session buffers, grown by every poll cycle until drained
    pub fn buffers(&self) -> &ChannelBuffers {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut ChannelBuffers {
        &mut self.buffers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn into_hardware(self) -> H {
        self.hardware
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use uom::si::{electric_potential::volt, f64::ElectricPotential};

    use super::*;
    use crate::controller::backend::sim::{SimCall, SimCycle, SimDevice};
    use crate::controller::clock::ManualClock;
    use crate::controller::status::InstrumentState;

    fn channels(ids: &[u16]) -> Vec<ChannelId> {
        ids.iter().copied().map(ChannelId::new).collect()
    }

    fn request(ids: &[u16]) -> AcquisitionRequest {
        AcquisitionRequest::record(
            channels(ids),
            Frequency::new::<hertz>(1000.0),
            ElectricPotential::new::<volt>(10.0),
        )
    }

    fn controller(
        cycles: impl IntoIterator<Item = SimCycle>,
    ) -> AcquisitionController<SimDevice, ManualClock> {
        AcquisitionController::with_clock(SimDevice::scripted(2, cycles), ManualClock::default())
            .unwrap()
    }

    #[test]
    fn new_reads_capacity_and_disables_auto_configure() {
        let controller = controller([]);
        assert_eq!(controller.channel_capacity(), 2);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(!controller.hardware().auto_configure());
    }

    #[test]
    fn start_configures_the_instrument_in_order() {
        let mut controller = controller([]);
        controller.hardware_mut().clear_calls();

        controller
            .start(request(&[0, 1]).with_target_samples(500))
            .unwrap();

        assert_eq!(controller.state(), ControllerState::Armed);
        let calls = controller.hardware().calls();
        assert_eq!(calls[0], SimCall::ChannelEnable(ChannelId::new(0), true));
        assert_eq!(calls[1], SimCall::ChannelEnable(ChannelId::new(1), true));
        assert_eq!(calls[2], SimCall::ChannelRange(ChannelId::new(0), 10.0));
        assert_eq!(calls[3], SimCall::ChannelRange(ChannelId::new(1), 10.0));
        assert_eq!(calls[4], SimCall::SetAcquisitionMode(AcquisitionMode::Record));
        assert_eq!(calls[5], SimCall::SampleRate(1000.0));
        assert!(matches!(calls[6], SimCall::RecordLength(_)));
        assert_eq!(
            calls[7],
            SimCall::Configure {
                reset_trigger: true,
                start: true
            }
        );
        assert!(controller.hardware().is_running());
    }

    #[test]
    fn invalid_channel_fails_before_any_hardware_call() {
        let mut controller = controller([]);
        controller.hardware_mut().clear_calls();

        let err = controller.start(request(&[0, 2])).unwrap_err();
        assert_eq!(
            err,
            AcquisitionError::Configuration(ConfigurationError::InvalidChannel {
                channel: 2,
                capacity: Some(2)
            })
        );
        assert!(controller.hardware().calls().is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn unsupported_mode_is_rejected_at_start() {
        let mut controller = controller([]);
        controller.hardware_mut().clear_calls();

        let err = controller
            .start(request(&[0]).with_mode(AcquisitionMode::Single))
            .unwrap_err();
        assert_eq!(
            err,
            AcquisitionError::Configuration(ConfigurationError::UnsupportedMode(
                AcquisitionMode::Single
            ))
        );
        assert!(controller.hardware().calls().is_empty());
    }

    #[test]
    fn hardware_fault_during_start_propagates_unchanged() {
        let mut controller = controller([]);
        let fault = HardwareFault::Disconnected("usb reset".into());
        controller.hardware_mut().inject_fault(fault.clone());

        assert_eq!(
            controller.start(request(&[0])),
            Err(AcquisitionError::Hardware(fault))
        );
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.request().is_none());
    }

    #[test]
    fn hardware_fault_during_poll_propagates_unchanged() {
        let mut controller = controller([SimCycle::running(4), SimCycle::running(4)]);
        controller.start(request(&[0])).unwrap();
        let fault = HardwareFault::Sdk {
            call: "FDwfAnalogInStatus",
            code: 3,
            message: "communication with the device failed".into(),
        };
        controller.hardware_mut().inject_fault(fault.clone());

        assert_eq!(controller.poll(), Err(AcquisitionError::Hardware(fault)));
        assert!(controller.buffers().is_empty());
        assert_eq!(controller.poll().unwrap().sample_count(), 4);
    }

    #[test]
    fn hardware_fault_ends_blocking_read_without_retry() {
        let mut controller = controller([SimCycle::running(4)]);
        controller.start(request(&[0])).unwrap();
        let fault = HardwareFault::Disconnected("usb reset".into());
        controller.hardware_mut().inject_fault(fault.clone());

        let err = controller
            .read_blocking(&channels(&[0]), 8, Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err, AcquisitionError::Hardware(fault));
        assert!(!err.is_retryable());
        assert_eq!(controller.clock().sleeps(), 0);
    }

    #[test]
    fn range_steps_come_from_the_device() {
        let mut controller = controller([]);
        let steps = controller.range_steps().unwrap();
        assert_eq!(steps.first(), Some(&ElectricPotential::new::<volt>(0.5)));
        assert_eq!(steps.last(), Some(&ElectricPotential::new::<volt>(50.0)));
    }

    #[test]
    fn poll_before_start_is_a_configuration_error() {
        let mut controller = controller([]);
        assert_eq!(
            controller.poll(),
            Err(AcquisitionError::Configuration(ConfigurationError::NotStarted))
        );
    }

    #[test]
    fn poll_in_pre_run_states_returns_empty_result() {
        let mut controller = controller([
            SimCycle::in_state(InstrumentState::Config).with_lost(4),
            SimCycle::in_state(InstrumentState::Prefill),
            SimCycle::in_state(InstrumentState::Armed).with_corrupted(2),
        ]);
        controller.start(request(&[0, 1])).unwrap();

        for _ in 0..3 {
            let result = controller.poll().unwrap();
            assert!(result.is_empty());
            assert_eq!((result.lost, result.corrupted), (0, 0));
        }
        assert_eq!(controller.tracker().lost_count(), 0);
        assert_eq!(controller.tracker().corrupted_count(), 0);
        assert_eq!(controller.state(), ControllerState::Armed);
        assert!(
            !controller
                .hardware()
                .calls()
                .contains(&SimCall::RecordStatus)
        );
    }

    #[test]
    fn poll_accumulates_counters_and_appends_samples() {
        let mut controller = controller([
            SimCycle::running(0).with_lost(2),
            SimCycle::running(3).with_corrupted(1),
            SimCycle::running(2),
        ]);
        controller.start(request(&[0, 1])).unwrap();

        let first = controller.poll().unwrap();
        assert!(first.is_empty());
        assert_eq!((first.lost, first.corrupted), (2, 0));
        assert_eq!(controller.state(), ControllerState::Streaming);

        let second = controller.poll().unwrap();
        assert_eq!(second.sample_count(), 3);
        assert_eq!(second.samples.samples(1), &[0.0, 1.0, 2.0]);
        assert_eq!((second.lost, second.corrupted), (2, 1));

        let third = controller.poll().unwrap();
        assert_eq!(third.samples.samples(0), &[3.0, 4.0]);

        assert_eq!(controller.buffers().samples(0), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(controller.buffers().len_of(1), 5);
        assert_eq!(controller.tracker().sample_count(), 5);
    }

    #[test]
    fn pre_run_state_after_delivery_still_reads_status() {
        let mut controller = controller([
            SimCycle::running(1),
            SimCycle {
                available: 1,
                ..SimCycle::in_state(InstrumentState::Armed)
            },
        ]);
        controller.start(request(&[0])).unwrap();

        controller.poll().unwrap();
        let result = controller.poll().unwrap();
        assert_eq!(result.sample_count(), 1);
    }

    #[test]
    fn poll_fails_when_mode_changed_behind_our_back() {
        let mut controller = controller([SimCycle::running(5)]);
        controller.start(request(&[0])).unwrap();
        controller
            .hardware_mut()
            .force_acquisition_mode(AcquisitionMode::ScanShift.code());

        assert_eq!(
            controller.poll(),
            Err(AcquisitionError::Configuration(
                ConfigurationError::UnsupportedMode(AcquisitionMode::ScanShift)
            ))
        );
    }

    #[test]
    fn unknown_status_code_is_a_hardware_fault() {
        let mut controller = controller([SimCycle::raw_state(42)]);
        controller.start(request(&[0])).unwrap();

        assert_eq!(
            controller.poll(),
            Err(AcquisitionError::Hardware(
                HardwareFault::UnknownInstrumentState(42)
            ))
        );
    }

    #[test]
    fn negative_record_counts_are_a_hardware_fault() {
        let mut controller = controller([SimCycle::running(-1)]);
        controller.start(request(&[0])).unwrap();

        assert!(matches!(
            controller.poll(),
            Err(AcquisitionError::Hardware(
                HardwareFault::InvalidRecordStatus { available: -1, .. }
            ))
        ));
    }

    #[test]
    fn read_blocking_with_zero_target_returns_immediately() {
        let mut controller = controller([]);
        controller.start(request(&[0, 1])).unwrap();
        controller.hardware_mut().clear_calls();

        let read = controller
            .read_blocking(&channels(&[0, 1]), 0, Duration::from_millis(10))
            .unwrap();
        assert!(read.buffers.is_empty());
        assert_eq!(read.buffers.channels(), channels(&[0, 1]).as_slice());
        assert!(controller.hardware().calls().is_empty());
        assert_eq!(controller.clock().sleeps(), 0);
    }

    #[test]
    fn read_blocking_times_out_without_data() {
        let mut controller = controller([]);
        controller.start(request(&[0, 1])).unwrap();

        let err = controller
            .read_blocking(&channels(&[0, 1]), 100, Duration::from_millis(500))
            .unwrap_err();
        match err {
            AcquisitionError::Timeout {
                obtained,
                requested,
                elapsed,
            } => {
                assert_eq!(obtained, 0);
                assert_eq!(requested, 100);
                assert!(elapsed > Duration::from_millis(500));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(controller.hardware().status_queries(), 6);
    }

    #[test]
    fn read_blocking_without_representable_deadline_waits_for_data() {
        let mut controller = controller([
            SimCycle::running(0),
            SimCycle::running(6),
            SimCycle::running(6),
        ]);
        controller.clock_mut().advance(Duration::from_millis(1));
        controller.start(request(&[0])).unwrap();

        let read = controller
            .read_blocking(&channels(&[0]), 10, Duration::MAX)
            .unwrap();
        assert_eq!(read.buffers.first_len(), 12);
        assert_eq!(controller.clock().sleeps(), 2);
    }

    #[test]
    fn read_blocking_requires_the_session_channels() {
        let mut controller = controller([]);
        controller.start(request(&[0, 1])).unwrap();

        assert!(matches!(
            controller.read_blocking(&channels(&[1]), 10, Duration::from_secs(1)),
            Err(AcquisitionError::Configuration(
                ConfigurationError::ChannelSetMismatch { .. }
            ))
        ));
    }

    #[test]
    fn read_blocking_respects_poll_interval() {
        let mut controller = controller([
            SimCycle::in_state(InstrumentState::Prefill),
            SimCycle::running(4),
            SimCycle::running(4),
        ])
        .with_poll_interval(Duration::from_millis(20));
        controller.start(request(&[0])).unwrap();

        let read = controller
            .read_blocking(&channels(&[0]), 8, Duration::from_secs(1))
            .unwrap();
        assert_eq!(read.buffers.first_len(), 8);
        assert_eq!(controller.clock().sleeps(), 2);
        assert_eq!(controller.clock().now(), Duration::from_millis(40));
    }

    #[test]
    fn stop_returns_to_idle_and_keeps_buffers() {
        let mut controller = controller([SimCycle::running(3)]);
        controller.start(request(&[0])).unwrap();
        controller.poll().unwrap();

        controller.stop();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.buffers().first_len(), 3);
        assert_eq!(
            controller.poll(),
            Err(AcquisitionError::Configuration(ConfigurationError::NotStarted))
        );
    }

    #[test]
    fn restart_resets_counters_and_buffers() {
        let mut controller = controller([SimCycle::running(3).with_lost(7)]);
        controller.start(request(&[0])).unwrap();
        controller.poll().unwrap();
        assert_eq!(controller.tracker().lost_count(), 7);

        controller.start(request(&[1])).unwrap();
        assert_eq!(controller.tracker().lost_count(), 0);
        assert_eq!(controller.tracker().sample_count(), 0);
        assert!(controller.buffers().is_empty());
        assert_eq!(controller.buffers().channels(), channels(&[1]).as_slice());
    }
}
