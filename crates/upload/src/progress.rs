use std::sync::Mutex;

/// Highest percentage reported before storage confirms success.
const MAX_PENDING_PERCENT: u8 = 99;

/// Turns attempt-based estimates and byte-level progress into a single
/// non-decreasing percentage.
///
/// A retry restarting from byte 0 never moves the bar backwards, and
/// nothing reaches 100 until [`complete`](Self::complete) is called.
#[derive(Debug, Default)]
pub struct ProgressGauge {
    last: Mutex<Option<u8>>,
}

impl ProgressGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a new estimate. Returns the value to report if it moves the
    /// gauge forward (or is the first value), `None` otherwise.
    pub fn report(&self, percent: u8) -> Option<u8> {
        let capped = percent.min(MAX_PENDING_PERCENT);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(prev) if capped <= prev => None,
            _ => {
                *last = Some(capped);
                Some(capped)
            }
        }
    }

    /// Offers byte-level progress for the current attempt.
    pub fn report_bytes(&self, sent: u64, total: u64) -> Option<u8> {
        if total == 0 {
            return None;
        }
        let percent = sent.min(total).saturating_mul(100) / total;
        self.report(percent as u8)
    }

    /// Marks the upload finished and returns 100.
    pub fn complete(&self) -> u8 {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(100);
        100
    }

    /// Last reported value, if any.
    pub fn current(&self) -> Option<u8> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Attempt-based estimate shown when an attempt starts: `attempt / max * 100`
/// with a 0-based `attempt`.
pub fn attempt_percent(attempt: u32, max_attempts: u32) -> u8 {
    if max_attempts == 0 {
        return 0;
    }
    (u64::from(attempt.min(max_attempts)) * 100 / u64::from(max_attempts)) as u8
}
