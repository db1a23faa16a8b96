/// Cumulative sample accounting of one acquisition session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionTracker {
    lost_count: u64,
    corrupted_count: u64,
    sample_count: u64,
    requested_samples: Option<u64>,
}

impl AcquisitionTracker {
    /// Zero all counters, the requested sample budget is kept
    pub fn reset(&mut self) {
        self.lost_count = 0;
        self.corrupted_count = 0;
        self.sample_count = 0;
    }

    pub fn start_session(&mut self, requested_samples: Option<u64>) {
        self.reset();
        self.requested_samples = requested_samples;
    }

    pub fn accumulate(&mut self, lost: u64, corrupted: u64) {
        self.lost_count = self.lost_count.saturating_add(lost);
        self.corrupted_count = self.corrupted_count.saturating_add(corrupted);
    }

    pub fn record_delivered(&mut self, samples: u64) {
        self.sample_count = self.sample_count.saturating_add(samples);
    }

    pub fn lost_count(&self) -> u64 {
        self.lost_count
    }

    pub fn corrupted_count(&self) -> u64 {
        self.corrupted_count
    }

    /// Samples per channel handed out since the session started
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn has_delivered(&self) -> bool {
        self.sample_count > 0
    }

    pub fn requested_samples(&self) -> Option<u64> {
        self.requested_samples
    }
}
