pub mod waveforms_hardware;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "dwf")]
pub mod dwf;
