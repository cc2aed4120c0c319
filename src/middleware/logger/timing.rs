//! Per-exchange timing marks.
//!
//! Two monotonic instants are recorded for each exchange: `started_at`,
//! when the logger first sees the request, and `headers_sent_at`, when the
//! response head is handed to the connection. The second mark is set at
//! most once and may never be set at all if the exchange is aborted first.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Timing marks for one exchange.
///
/// Shared between the headers hook (writer) and the render routine (reader)
/// through an `Arc`; the one-shot mark needs no lock.
#[derive(Debug)]
pub struct TimingMarks {
    started_at: Instant,
    headers_sent_at: OnceLock<Instant>,
}

impl TimingMarks {
    /// Marks the start of an exchange now.
    pub fn start() -> Self {
        Self::from_instants(Instant::now(), None)
    }

    /// Builds marks from instants captured elsewhere.
    pub fn from_instants(started_at: Instant, headers_sent_at: Option<Instant>) -> Self {
        let marks = Self { started_at, headers_sent_at: OnceLock::new() };
        if let Some(at) = headers_sent_at {
            marks.mark_headers_sent_at(at);
        }
        marks
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn headers_sent_at(&self) -> Option<Instant> {
        self.headers_sent_at.get().copied()
    }

    /// Records that the response head is being sent. Only the first call
    /// has an effect.
    pub fn mark_headers_sent(&self) {
        self.mark_headers_sent_at(Instant::now());
    }

    fn mark_headers_sent_at(&self, at: Instant) {
        // Never earlier than the start mark.
        let _ = self.headers_sent_at.set(at.max(self.started_at));
    }

    /// Time from the start mark until the response head went out.
    pub fn response_time(&self) -> Option<Duration> {
        self.headers_sent_at()
            .map(|sent| sent.saturating_duration_since(self.started_at))
    }

    /// Time from the start mark until `now`.
    pub fn total_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Formats a duration as milliseconds with exactly three decimals, rounded
/// to the nearest microsecond: 12.345 ms is `"12.345"`.
pub fn format_millis(elapsed: Duration) -> String {
    let micros = (elapsed.as_nanos() + 500) / 1_000;
    format!("{}.{:03}", micros / 1_000, micros % 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_have_three_decimals() {
        assert_eq!(format_millis(Duration::ZERO), "0.000");
        assert_eq!(format_millis(Duration::from_micros(12_345)), "12.345");
        assert_eq!(format_millis(Duration::from_nanos(1_999_600)), "2.000");
        assert_eq!(format_millis(Duration::from_nanos(400)), "0.000");
        assert_eq!(format_millis(Duration::from_secs(3)), "3000.000");
    }

    #[test]
    fn response_time_needs_the_headers_mark() {
        let marks = TimingMarks::start();
        assert_eq!(marks.response_time(), None);

        marks.mark_headers_sent();
        assert!(marks.response_time().is_some());
    }

    #[test]
    fn headers_mark_is_set_once() {
        let start = Instant::now();
        let marks = TimingMarks::from_instants(start, Some(start + Duration::from_millis(5)));

        marks.mark_headers_sent();

        assert_eq!(marks.headers_sent_at(), Some(start + Duration::from_millis(5)));
        assert_eq!(marks.response_time(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn headers_mark_never_precedes_start() {
        let start = Instant::now() + Duration::from_millis(10);
        let marks = TimingMarks::from_instants(start, Some(Instant::now()));
        assert_eq!(marks.response_time(), Some(Duration::ZERO));
    }

    #[test]
    fn total_time_is_measured_to_the_given_instant() {
        let start = Instant::now();
        let marks = TimingMarks::from_instants(start, None);
        assert_eq!(marks.total_time(start + Duration::from_micros(750)), Duration::from_micros(750));
        assert_eq!(marks.total_time(start), Duration::ZERO);
    }
}
