use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use tracing::{error, warn};

use super::bindings::*;
use crate::controller::backend::waveforms_hardware::HardwareFault;
use crate::device::{DeviceInfo, DeviceType};

/// Size of the SDK's error message buffer
const ERROR_MESSAGE_LEN: usize = 512;
/// Size of the SDK's device name and serial number buffers
const IDENTITY_LEN: usize = 32;

/// Safety wrapper for an open WaveForms device handle, the device is closed on drop
#[derive(Debug)]
pub struct DeviceHandle {
    inner: HDWF,
}

// The SDK serializes calls per handle internally, the handle itself is a plain integer
unsafe impl Send for DeviceHandle {}

impl DeviceHandle {
    pub fn open(index: usize) -> Result<Self, HardwareFault> {
        let mut inner = hdwfNone;
        unsafe {
            check("FDwfDeviceOpen", FDwfDeviceOpen(as_c_int(index)?, &mut inner))?;
        }
        if inner == hdwfNone {
            return Err(HardwareFault::Sdk {
                call: "FDwfDeviceOpen",
                code: last_error_code(),
                message: last_error_message(),
            });
        }
        Ok(Self { inner })
    }

    pub fn raw(&self) -> HDWF {
        self.inner
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        unsafe {
            if FDwfDeviceClose(self.inner) == 0 {
                warn!("closing WaveForms device handle failed: {}", last_error_message());
            }
        }
    }
}

/// Turn a WaveForms BOOL result into an error carrying the SDK's last error
pub fn check(call: &'static str, result: BOOL) -> Result<(), HardwareFault> {
    if result != 0 {
        return Ok(());
    }

    let code = last_error_code();
    let message = last_error_message();
    error!("{call} failed with code {code}: {message}");
    Err(HardwareFault::Sdk {
        call,
        code,
        message,
    })
}

pub fn last_error_code() -> i32 {
    let mut code: DWFERC = 0;
    unsafe {
        FDwfGetLastError(&mut code);
    }
    code
}

pub fn last_error_message() -> String {
    let mut buf = [0 as c_char; ERROR_MESSAGE_LEN];
    unsafe {
        FDwfGetLastErrorMsg(buf.as_mut_ptr());
    }
    sdk_string(&buf)
}

pub fn as_c_int(value: usize) -> Result<c_int, HardwareFault> {
    c_int::try_from(value).map_err(|_| HardwareFault::Sdk {
        call: "argument conversion",
        code: 0,
        message: format!("{value} does not fit into a C int"),
    })
}

fn sdk_string(buf: &[c_char]) -> String {
    // The SDK always terminates its strings, fall back to an empty string if it did not
    CStr::from_bytes_until_nul(unsafe {
        std::slice::from_raw_parts(buf.as_ptr() as *const u8, buf.len())
    })
    .map(|text| text.to_string_lossy().trim().to_string())
    .unwrap_or_default()
}

/// Enumerate all connected devices and read their identity
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>, HardwareFault> {
    let mut count: c_int = 0;
    unsafe {
        check("FDwfEnum", FDwfEnum(enumfilterAll, &mut count))?;
    }

    (0..count).map(device_info).collect()
}

fn device_info(index: c_int) -> Result<DeviceInfo, HardwareFault> {
    let mut device_id: DEVID = 0;
    let mut revision: DEVVER = 0;
    let mut name = [0 as c_char; IDENTITY_LEN];
    let mut serial_number = [0 as c_char; IDENTITY_LEN];

    unsafe {
        check(
            "FDwfEnumDeviceType",
            FDwfEnumDeviceType(index, &mut device_id, &mut revision),
        )?;
        check("FDwfEnumDeviceName", FDwfEnumDeviceName(index, name.as_mut_ptr()))?;
        check("FDwfEnumSN", FDwfEnumSN(index, serial_number.as_mut_ptr()))?;
    }

    Ok(DeviceInfo {
        index: index as usize,
        device_type: DeviceType::from(device_id),
        name: sdk_string(&name),
        serial_number: sdk_string(&serial_number),
        revision,
    })
}

pub fn close_all() -> Result<(), HardwareFault> {
    unsafe { check("FDwfDeviceCloseAll", FDwfDeviceCloseAll()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_strings_stop_at_the_terminator() {
        let mut buf = [0 as c_char; 8];
        for (slot, byte) in buf.iter_mut().zip(b"SN:12\0xy") {
            *slot = *byte as c_char;
        }
        assert_eq!(sdk_string(&buf), "SN:12");
        assert_eq!(sdk_string(&[b'a' as c_char; 4]), "");
    }
}
