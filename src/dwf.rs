//! Bindings to the Digilent WaveForms SDK (`dwf` shared library)

pub(crate) mod bindings;
pub mod dwf_sys;

pub use dwf_sys::{DeviceHandle, check, close_all, enumerate_devices};
