use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::*;
use uom::si::frequency::hertz;

use crate::controller::AcquisitionController;
use crate::controller::backend::waveforms_hardware::WaveformsHardware;
use crate::controller::clock::Clock;
use crate::error::{AcquisitionError, ConfigurationError, StreamError};
use crate::sink::{BlockSink, SampleBlock};

/// Defines the frequency at which the instrument is polled while streaming
pub const DEFAULT_STREAM_PERIOD: Duration = Duration::from_millis(100);
/// Samples per channel handed to the sink at once
pub const DEFAULT_BLOCK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub period: Duration,
    /// 0 hands out whatever each poll cycle delivered
    pub block_size: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_STREAM_PERIOD,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// What is left after a streaming session ended
#[derive(Debug)]
pub struct StreamOutcome<H, C> {
    /// Stopped controller, samples that did not fill a whole block stay in its buffers
    pub controller: AcquisitionController<H, C>,
    pub blocks: u64,
    pub poll_cycles: u64,
}

/// Poll a started controller on a fixed period and feed full blocks into `sink`,
/// until `stop` turns true or its sender is dropped
pub async fn stream_blocks<H, C, S>(
    mut controller: AcquisitionController<H, C>,
    settings: StreamSettings,
    mut sink: S,
    mut stop: watch::Receiver<bool>,
) -> Result<StreamOutcome<H, C>, StreamError>
where
    H: WaveformsHardware + Send,
    C: Clock + Send,
    S: BlockSink,
{
    let Some(request) = controller.request() else {
        return Err(AcquisitionError::from(ConfigurationError::NotStarted).into());
    };
    let sample_rate = request.sample_rate.get::<hertz>();

    let mut ticker = time::interval(settings.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut blocks = 0u64;
    let mut poll_cycles = 0u64;
    let mut delivered_samples = 0u64;

    info!(
        "Streaming blocks of {} samples every {:?}",
        settings.block_size, settings.period
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
        }
        if *stop.borrow() {
            break;
        }

        controller.poll()?;
        poll_cycles += 1;

        loop {
            let buffers = controller.buffers_mut();
            let len = match settings.block_size {
                0 => buffers.min_len(),
                size => size,
            };
            let Some(channels) = buffers.take_block(len) else {
                break;
            };

            let tracker = controller.tracker();
            let block = SampleBlock {
                sequence: blocks,
                acquired_at: Utc::now(),
                start_offset_seconds: delivered_samples as f64 / sample_rate,
                channels,
                lost: tracker.lost_count(),
                corrupted: tracker.corrupted_count(),
            };
            delivered_samples += len as u64;
            blocks += 1;

            sink.consume(block).await?;
        }
    }

    info!(
        "Streaming stopped after {} blocks in {} poll cycles, {} samples per channel left unblocked",
        blocks,
        poll_cycles,
        controller.buffers().min_len()
    );
    controller.stop();

    Ok(StreamOutcome {
        controller,
        blocks,
        poll_cycles,
    })
}
