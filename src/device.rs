use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::backend::waveforms_hardware::{HardwareFault, WaveformsHardware};

/// WaveForms device families, by SDK device id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    ElectronicsExplorer,
    AnalogDiscovery,
    AnalogDiscovery2,
    DigitalDiscovery,
    AnalogDiscoveryPro3x50,
    AnalogDiscoveryPro5250,
    DiscoveryPowerSupply3340,
    Unknown(i32),
}

impl From<i32> for DeviceType {
    fn from(id: i32) -> Self {
        match id {
            1 => DeviceType::ElectronicsExplorer,
            2 => DeviceType::AnalogDiscovery,
            3 => DeviceType::AnalogDiscovery2,
            4 => DeviceType::DigitalDiscovery,
            6 => DeviceType::AnalogDiscoveryPro3x50,
            8 => DeviceType::AnalogDiscoveryPro5250,
            9 => DeviceType::DiscoveryPowerSupply3340,
            other => DeviceType::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::ElectronicsExplorer => write!(f, "Electronics Explorer"),
            DeviceType::AnalogDiscovery => write!(f, "Analog Discovery"),
            DeviceType::AnalogDiscovery2 => write!(f, "Analog Discovery 2"),
            DeviceType::DigitalDiscovery => write!(f, "Digital Discovery"),
            DeviceType::AnalogDiscoveryPro3x50 => write!(f, "Analog Discovery Pro 3x50"),
            DeviceType::AnalogDiscoveryPro5250 => write!(f, "Analog Discovery Pro 5250"),
            DeviceType::DiscoveryPowerSupply3340 => write!(f, "Discovery Power Supply 3340"),
            DeviceType::Unknown(id) => write!(f, "Unknown device type ({id})"),
        }
    }
}

/// Static identity of an enumerated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Enumeration index, only valid until the next enumeration
    pub index: usize,
    pub device_type: DeviceType,
    pub name: String,
    pub serial_number: String,
    pub revision: i32,
}

impl DeviceInfo {
    /// Name shown to users when picking a device, e.g. "Analog Discovery 2 (SN:210321ABC001)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.serial_number)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16}{}", "Type:", self.device_type)?;
        writeln!(f, "{:<16}{}", "Name:", self.name)?;
        writeln!(f, "{:<16}{}", "Serial number:", self.serial_number)?;
        write!(f, "{:<16}{}", "Revision:", self.revision)
    }
}

/// Lists connected instruments and opens them
pub trait DeviceEnumerator {
    type Device: WaveformsHardware;

    /// Re-enumerate connected devices
    fn devices(&mut self) -> Result<Vec<DeviceInfo>, HardwareFault>;

    fn open(&mut self, index: usize) -> Result<Self::Device, HardwareFault>;

    fn close_all(&mut self) -> Result<(), HardwareFault>;
}

/// Close every open handle, re-enumerate and open the device with `serial_number`
pub fn open_by_serial<E: DeviceEnumerator>(
    enumerator: &mut E,
    serial_number: &str,
) -> Result<(DeviceInfo, E::Device), HardwareFault> {
    enumerator.close_all()?;

    let Some(info) = enumerator
        .devices()?
        .into_iter()
        .find(|device| device.serial_number == serial_number)
    else {
        return Err(HardwareFault::DeviceNotFound(serial_number.to_string()));
    };

    open_info(enumerator, info)
}

/// Open the first enumerated device
pub fn open_first<E: DeviceEnumerator>(
    enumerator: &mut E,
) -> Result<(DeviceInfo, E::Device), HardwareFault> {
    let Some(info) = enumerator.devices()?.into_iter().next() else {
        return Err(HardwareFault::DeviceNotFound("<any>".to_string()));
    };

    open_info(enumerator, info)
}

fn open_info<E: DeviceEnumerator>(
    enumerator: &mut E,
    info: DeviceInfo,
) -> Result<(DeviceInfo, E::Device), HardwareFault> {
    info!("Opening device {}", info.display_name());

    match enumerator.open(info.index) {
        Ok(device) => Ok((info, device)),
        Err(fault) => {
            if let Err(close_fault) = enumerator.close_all() {
                warn!("unable to close device handles after failed open: {close_fault}");
            }
            Err(fault)
        }
    }
}
