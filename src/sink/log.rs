use tracing::info;

use crate::sink::{BlockSink, SampleBlock, SinkError};

/// Logs a per channel summary of every block
#[derive(Debug, Default)]
pub struct LogSink {
    blocks: u64,
}

impl LogSink {
    pub fn blocks(&self) -> u64 {
        self.blocks
    }
}

#[async_trait::async_trait]
impl BlockSink for LogSink {
    async fn consume(&mut self, block: SampleBlock) -> Result<(), SinkError> {
        self.blocks += 1;
        let means = block
            .channel_means()
            .into_iter()
            .map(|(channel, mean)| format!("ch{channel}={mean:.4} V"))
            .collect::<Vec<_>>()
            .join(", ");

        info!(
            "block {} at t={:.3}s: {} samples, mean {} ({} lost, {} corrupted)",
            block.sequence,
            block.start_offset_seconds,
            block.len(),
            means,
            block.lost,
            block.corrupted
        );
        Ok(())
    }
}
