use serde::Serialize;
use tokio::time::{Duration, Instant};

/// Why a camera event was or was not handed to the resolution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanDecision {
    Accepted,
    TooSoon,
    Busy,
    Duplicate,
}

/// Filters the stream of barcode events coming off the camera.
///
/// An event is dropped when it arrives within `threshold` of the last
/// accepted one, while a resolution is in flight, or when it repeats the last
/// accepted value.
#[derive(Debug)]
pub struct ScanDebouncer {
    threshold: Duration,
    last_accepted_at: Option<Instant>,
    busy: bool,
    last_barcode: String,
}

impl ScanDebouncer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_accepted_at: None,
            busy: false,
            last_barcode: String::new(),
        }
    }

    /// On acceptance the timestamp and value are recorded and the busy flag
    /// is raised before returning.
    pub fn try_accept(&mut self, barcode: &str, now: Instant) -> ScanDecision {
        if let Some(last) = self.last_accepted_at {
            if now.saturating_duration_since(last) < self.threshold {
                return ScanDecision::TooSoon;
            }
        }
        if self.busy {
            return ScanDecision::Busy;
        }
        if self.last_barcode == barcode {
            return ScanDecision::Duplicate;
        }

        self.last_accepted_at = Some(now);
        self.last_barcode = barcode.to_string();
        self.busy = true;
        ScanDecision::Accepted
    }

    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }

    /// Resolution succeeded.
    pub fn finish(&mut self) {
        self.busy = false;
    }

    /// Resolution failed; the same barcode may be scanned again right away.
    pub fn fail(&mut self) {
        self.busy = false;
        self.last_barcode.clear();
    }

    /// Host screen regained focus.
    pub fn reset_last_barcode(&mut self) {
        self.last_barcode.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_barcode(&self) -> &str {
        &self.last_barcode
    }
}
