use crate::controller::backend::waveforms_hardware::{HardwareFault, WaveformsHardware};
use crate::controller::request::AcquisitionMode;

/// Analog input instrument states, discriminants are the WaveForms SDK status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentState {
    Ready = 0,
    Armed = 1,
    Done = 2,
    /// Reported as both "triggered" and "running" by the SDK
    Running = 3,
    Config = 4,
    Prefill = 5,
    NotDone = 6,
    Wait = 7,
}

impl InstrumentState {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// States in which the instrument has not produced any data yet
    pub fn is_pre_run(self) -> bool {
        matches!(
            self,
            InstrumentState::Config | InstrumentState::Prefill | InstrumentState::Armed
        )
    }
}

impl TryFrom<u8> for InstrumentState {
    type Error = HardwareFault;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(InstrumentState::Ready),
            1 => Ok(InstrumentState::Armed),
            2 => Ok(InstrumentState::Done),
            3 => Ok(InstrumentState::Running),
            4 => Ok(InstrumentState::Config),
            5 => Ok(InstrumentState::Prefill),
            6 => Ok(InstrumentState::NotDone),
            7 => Ok(InstrumentState::Wait),
            other => Err(HardwareFault::UnknownInstrumentState(other)),
        }
    }
}

/// Number of samples per channel the instrument confirmed as readable in the current poll cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AvailableSamples(usize);

impl AvailableSamples {
    pub(crate) fn confirmed(count: usize) -> Self {
        Self(count)
    }

    pub fn count(self) -> usize {
        self.0
    }
}

/// Per poll cycle record counters, not cumulative
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordStatus {
    pub available: AvailableSamples,
    pub lost: u64,
    pub corrupted: u64,
}

pub fn get_state<H: WaveformsHardware + ?Sized>(
    hardware: &mut H,
) -> Result<InstrumentState, HardwareFault> {
    InstrumentState::try_from(hardware.status(true)?)
}

pub fn get_record_status<H: WaveformsHardware + ?Sized>(
    hardware: &mut H,
) -> Result<RecordStatus, HardwareFault> {
    let (available, lost, corrupted) = hardware.record_status()?;

    match (
        usize::try_from(available),
        u64::try_from(lost),
        u64::try_from(corrupted),
    ) {
        (Ok(available), Ok(lost), Ok(corrupted)) => Ok(RecordStatus {
            available: AvailableSamples::confirmed(available),
            lost,
            corrupted,
        }),
        _ => Err(HardwareFault::InvalidRecordStatus {
            available,
            lost,
            corrupted,
        }),
    }
}

pub fn get_acquisition_mode<H: WaveformsHardware + ?Sized>(
    hardware: &mut H,
) -> Result<AcquisitionMode, HardwareFault> {
    AcquisitionMode::try_from(hardware.acquisition_mode()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_sdk_status_code_maps_to_a_state() {
        for code in 0..=7u8 {
            let state = InstrumentState::try_from(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert_eq!(
            InstrumentState::try_from(8),
            Err(HardwareFault::UnknownInstrumentState(8))
        );
    }

    #[test]
    fn pre_run_states() {
        assert!(InstrumentState::Config.is_pre_run());
        assert!(InstrumentState::Prefill.is_pre_run());
        assert!(InstrumentState::Armed.is_pre_run());
        assert!(!InstrumentState::Running.is_pre_run());
        assert!(!InstrumentState::Done.is_pre_run());
    }
}
