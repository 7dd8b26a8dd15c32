use std::time::{Duration, Instant};

pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a descriptor timestamp as an `HH:MM:SS.mmm` seek timecode.
///
/// Descriptor timestamps are microseconds. Dividing by 1000 gives the
/// millisecond offset, which is then split into its fields.
pub fn format_timecode(timestamp: u64) -> String {
    let millis_total = timestamp / 1000;

    let hours = millis_total / 3_600_000;
    let minutes = (millis_total % 3_600_000) / 60_000;
    let seconds = (millis_total % 60_000) / 1000;
    let millis = millis_total % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
