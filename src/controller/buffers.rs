use ndarray::Array2;

use crate::controller::request::ChannelId;

/// One append-only sample sequence per channel, in channel set order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelBuffers {
    channels: Vec<ChannelId>,
    samples: Vec<Vec<f64>>,
}

impl ChannelBuffers {
    pub fn new(channels: &[ChannelId]) -> Self {
        Self {
            channels: channels.to_vec(),
            samples: vec![Vec::new(); channels.len()],
        }
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Append to the buffer at position `channel_index` of the channel set
    pub fn append(&mut self, channel_index: usize, samples: &[f64]) {
        debug_assert!(channel_index < self.samples.len());
        if let Some(buffer) = self.samples.get_mut(channel_index) {
            buffer.extend_from_slice(samples);
        }
    }

    /// Append every channel of `other`, matched by position
    pub fn extend_from(&mut self, other: &ChannelBuffers) {
        for (index, samples) in other.samples.iter().enumerate() {
            self.append(index, samples);
        }
    }

    pub fn samples(&self, channel_index: usize) -> &[f64] {
        self.samples
            .get(channel_index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len_of(&self, channel_index: usize) -> usize {
        self.samples(channel_index).len()
    }

    /// Sample count of the first channel, the reference for progress tracking
    pub fn first_len(&self) -> usize {
        self.len_of(0)
    }

    pub fn min_len(&self) -> usize {
        self.samples.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.iter().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &[f64])> {
        self.channels
            .iter()
            .copied()
            .zip(self.samples.iter().map(Vec::as_slice))
    }

    /// Remove the first `len` samples of every channel once all channels hold that many
    pub fn take_block(&mut self, len: usize) -> Option<Vec<(ChannelId, Vec<f64>)>> {
        if len == 0 || self.samples.is_empty() || self.min_len() < len {
            return None;
        }

        Some(
            self.channels
                .iter()
                .copied()
                .zip(self.samples.iter_mut())
                .map(|(channel, buffer)| (channel, buffer.drain(..len).collect()))
                .collect(),
        )
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(Vec::clear);
    }

    pub fn into_vec(self) -> Vec<Vec<f64>> {
        self.samples
    }

    /// Rectangular (channel, sample) copy of the samples every channel has
    pub fn to_array(&self) -> Array2<f64> {
        let len = self.min_len();
        Array2::from_shape_fn((self.samples.len(), len), |(channel, sample)| {
            self.samples[channel][sample]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers() -> ChannelBuffers {
        ChannelBuffers::new(&[ChannelId::new(0), ChannelId::new(3)])
    }

    #[test]
    fn create_gives_one_empty_buffer_per_channel() {
        let buffers = buffers();
        assert_eq!(buffers.channels(), &[ChannelId::new(0), ChannelId::new(3)]);
        assert!(buffers.is_empty());
        assert_eq!(buffers.len_of(1), 0);
        assert_eq!(buffers.len_of(7), 0);
    }

    #[test]
    fn append_and_extend_keep_channel_order() {
        let mut buffers = buffers();
        buffers.append(0, &[1.0, 2.0]);
        buffers.append(1, &[10.0, 20.0]);

        let mut batch = ChannelBuffers::new(buffers.channels());
        batch.append(0, &[3.0]);
        batch.append(1, &[30.0]);
        buffers.extend_from(&batch);

        assert_eq!(buffers.samples(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buffers.samples(1), &[10.0, 20.0, 30.0]);
        assert_eq!(buffers.first_len(), 3);
    }

    #[test]
    fn take_block_truncates_consumed_prefix() {
        let mut buffers = buffers();
        buffers.append(0, &[1.0, 2.0, 3.0]);
        buffers.append(1, &[4.0, 5.0]);

        assert_eq!(buffers.take_block(3), None);
        assert_eq!(buffers.take_block(0), None);

        let block = buffers.take_block(2).unwrap();
        assert_eq!(
            block,
            vec![
                (ChannelId::new(0), vec![1.0, 2.0]),
                (ChannelId::new(3), vec![4.0, 5.0])
            ]
        );
        assert_eq!(buffers.samples(0), &[3.0]);
        assert!(buffers.samples(1).is_empty());
    }

    #[test]
    fn to_array_is_cut_to_shortest_channel() {
        let mut buffers = buffers();
        buffers.append(0, &[1.0, 2.0, 3.0]);
        buffers.append(1, &[4.0, 5.0]);

        let array = buffers.to_array();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 1]], 5.0);
    }
}
