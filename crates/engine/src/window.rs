//! Rolling time windows for KPI aggregation.
//!
//! A [`RollingWindow`] is a time-ordered ring of `(timestamp, value)`
//! entries with lazy eviction: expired entries are drained on the next
//! push or read against a caller-supplied "now". Drained entries are
//! returned so the caller can subtract them from any running sums it
//! maintains, keeping reads O(1).

use std::collections::VecDeque;

use chrono::Duration;

use granary_core::types::Timestamp;

/// Time-bounded ring of timestamped values.
#[derive(Debug)]
pub struct RollingWindow<T> {
    span: Duration,
    entries: VecDeque<(Timestamp, T)>,
}

impl<T> RollingWindow<T> {
    /// Create a window covering the trailing `span`.
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            entries: VecDeque::new(),
        }
    }

    /// Append an entry. Entries are expected in roughly monotonic order;
    /// the tolerated sensor clock skew is far smaller than any window span,
    /// so slightly late entries only sit marginally out of order.
    pub fn push(&mut self, at: Timestamp, value: T) {
        self.entries.push_back((at, value));
    }

    /// Drain and return every entry that fell out of the window as of
    /// `now`.
    pub fn evict(&mut self, now: Timestamp) -> Vec<(Timestamp, T)> {
        let cutoff = now - self.span;
        let mut drained = Vec::new();
        while let Some((at, _)) = self.entries.front() {
            if *at > cutoff {
                break;
            }
            // Checked front() above.
            if let Some(entry) = self.entries.pop_front() {
                drained.push(entry);
            }
        }
        drained
    }

    /// Number of live entries (after the most recent eviction).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over live entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &(Timestamp, T)> {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn entries_inside_span_are_kept() {
        let mut window = RollingWindow::new(Duration::minutes(10));
        window.push(at(0), 1);
        window.push(at(5), 2);

        let drained = window.evict(at(9));
        assert!(drained.is_empty());
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn expired_entries_are_drained_oldest_first() {
        let mut window = RollingWindow::new(Duration::minutes(10));
        window.push(at(0), 1);
        window.push(at(5), 2);
        window.push(at(12), 3);

        let drained = window.evict(at(15));
        assert_eq!(drained.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn entry_exactly_at_cutoff_is_evicted() {
        let mut window = RollingWindow::new(Duration::minutes(10));
        window.push(at(0), 1);

        let drained = window.evict(at(10));
        assert_eq!(drained.len(), 1);
        assert!(window.is_empty());
    }

    #[test]
    fn evict_on_empty_window_is_noop() {
        let mut window: RollingWindow<i32> = RollingWindow::new(Duration::hours(24));
        assert!(window.evict(at(0)).is_empty());
    }
}
