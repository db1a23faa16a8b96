use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task;
use tokio::time;
use tracing::*;
use tracing_subscriber::FmtSubscriber;

use wave_sense::config::HostConfig;
use wave_sense::controller::AcquisitionController;
use wave_sense::device::{self, DeviceEnumerator, DeviceInfo};
use wave_sense::sink::log::LogSink;
use wave_sense::streaming_task::stream_blocks;

#[cfg(not(any(feature = "sim", feature = "dwf")))]
compile_error!("enable the `sim` or the `dwf` feature to select an instrument backend");

#[cfg(feature = "dwf")]
type Enumerator = wave_sense::controller::backend::dwf::DwfEnumerator;
#[cfg(all(feature = "sim", not(feature = "dwf")))]
type Enumerator = wave_sense::controller::backend::sim::SimEnumerator;

type Device = <Enumerator as DeviceEnumerator>::Device;

/// Application & Tokio executor entrypoint
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HostConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => HostConfig::default(),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level()?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber failed")?;

    let (info, device) = open_device(&config)?;
    info!("Using device:\n{info}");

    let mut controller = AcquisitionController::new(device)
        .context("initializing acquisition controller")?
        .with_poll_interval(config.poll_interval());
    let (min_rate, max_rate) = controller.sample_rate_limits()?;
    info!(
        "Device supports sample rates from {:?} to {:?}",
        min_rate, max_rate
    );
    let range_steps = controller.range_steps()?;
    info!("Device input ranges (peak to peak): {:?}", range_steps);

    // Blocking capture first, the blocking read sleeps so keep it off the executor threads
    let capture = config.clone();
    let mut controller = task::spawn_blocking(move || -> Result<_> {
        let request = capture.request.clone();
        let channels = request.channels.clone();
        controller
            .start(request)
            .context("starting blocking capture")?;

        match controller.read_blocking(
            &channels,
            capture.capture_samples,
            capture.capture_timeout(),
        ) {
            Ok(read) => {
                info!(
                    "Captured {} samples per channel ({} lost, {} corrupted)",
                    read.buffers.min_len(),
                    read.lost,
                    read.corrupted
                );
                for (channel, samples) in read.buffers.iter() {
                    let mean = samples.iter().sum::<f64>() / samples.len().max(1) as f64;
                    info!("channel {channel}: mean {mean:.4} V");
                }
            }
            Err(err) if err.is_retryable() => warn!("{err}"),
            Err(err) => return Err(err).context("blocking capture failed"),
        }
        controller.stop();
        Ok(controller)
    })
    .await??;

    // Then stream blocks for a while
    controller
        .start(config.request.clone())
        .context("starting streaming session")?;

    let (stop_sender, stop_receiver) = watch::channel(false);
    let handle = task::spawn(stream_blocks(
        controller,
        config.stream_settings(),
        LogSink::default(),
        stop_receiver,
    ));

    time::sleep(config.stream_duration()).await;
    if stop_sender.send(true).is_err() {
        warn!("streaming task ended before the stop signal");
    }

    let outcome = handle.await??;
    let tracker = outcome.controller.tracker();
    info!(
        "Streamed {} blocks, {} samples per channel delivered, {} lost, {} corrupted",
        outcome.blocks,
        tracker.sample_count(),
        tracker.lost_count(),
        tracker.corrupted_count()
    );

    Ok(())
}

fn open_device(config: &HostConfig) -> Result<(DeviceInfo, Device)> {
    let mut enumerator = Enumerator::default();
    let opened = match &config.device_serial {
        Some(serial) => device::open_by_serial(&mut enumerator, serial),
        None => device::open_first(&mut enumerator),
    };
    opened.context("opening WaveForms device")
}
