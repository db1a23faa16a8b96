use crate::controller::backend::waveforms_hardware::WaveformsHardware;
use crate::controller::buffers::ChannelBuffers;
use crate::controller::request::ChannelId;
use crate::controller::status::AvailableSamples;
use crate::error::{AcquisitionError, ConfigurationError};

/// Read exactly `count` samples of one channel, `count` may not exceed what the instrument confirmed
pub fn read_channel<H: WaveformsHardware + ?Sized>(
    hardware: &mut H,
    channel: ChannelId,
    count: usize,
    available: AvailableSamples,
) -> Result<Vec<f64>, AcquisitionError> {
    if count > available.count() {
        return Err(ConfigurationError::FetchExceedsAvailable {
            requested: count,
            available: available.count(),
        }
        .into());
    }

    let mut samples = vec![0.0; count];
    hardware.status_data(channel, &mut samples)?;
    Ok(samples)
}

/// Read all available samples of every channel, in channel order
pub fn read_channels<H: WaveformsHardware + ?Sized>(
    hardware: &mut H,
    channels: &[ChannelId],
    available: AvailableSamples,
) -> Result<ChannelBuffers, AcquisitionError> {
    let mut batch = ChannelBuffers::new(channels);
    for (index, &channel) in channels.iter().enumerate() {
        let samples = read_channel(hardware, channel, available.count(), available)?;
        batch.append(index, &samples);
    }
    Ok(batch)
}
