use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::sink::{BlockSink, SampleBlock, SinkError};

/// Forwards every block to a channel, for consumers living in another task
pub struct PassThroughSink {
    sender: Sender<SampleBlock>,
}

#[async_trait::async_trait]
impl BlockSink for PassThroughSink {
    async fn consume(&mut self, block: SampleBlock) -> Result<(), SinkError> {
        self.sender.send(block).await.map_err(|_| SinkError::Closed)
    }
}

impl PassThroughSink {
    pub fn new_with_receiver(capacity: usize) -> (Self, Receiver<SampleBlock>) {
        let (tx_block, rx_block) = mpsc::channel(capacity);
        (PassThroughSink { sender: tx_block }, rx_block)
    }
}
