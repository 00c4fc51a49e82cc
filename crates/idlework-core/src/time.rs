//! Wall-clock access and timestamp persistence.
//!
//! The clock never reads the system time directly; it asks a [`TimeSource`].
//! The last-save timestamp used for offline progress goes through a
//! [`TimestampStore`], so hosts can keep it wherever their save data lives.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Seconds between two timestamps. Zero when `later` is not after `earlier`.
pub fn seconds_between(earlier: Millis, later: Millis) -> f64 {
    later.saturating_sub(earlier) as f64 / 1000.0
}

/// Source of wall-clock milliseconds.
pub trait TimeSource: Send {
    fn now_millis(&self) -> Millis;
}

/// Reads [`SystemTime`]. A clock set before the epoch reads as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}

/// A hand-driven clock. Clones share the same reading, so a test can keep a
/// handle after giving one to a game.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: Millis) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Advance by fractional seconds, rounded to the millisecond.
    pub fn advance_secs(&self, seconds: f64) {
        self.advance_millis((seconds * 1000.0).round().max(0.0) as u64);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Where the last-save timestamp lives between sessions.
pub trait TimestampStore: Send {
    fn load(&self) -> Option<Millis>;
    fn save(&mut self, millis: Millis);
}

/// Timestamp store that lives only in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTimestampStore {
    saved: Option<Millis>,
}

impl MemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a timestamp from an earlier session.
    pub fn with_saved(millis: Millis) -> Self {
        Self {
            saved: Some(millis),
        }
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn load(&self) -> Option<Millis> {
        self.saved
    }

    fn save(&mut self, millis: Millis) {
        self.saved = Some(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let clock = ManualTimeSource::new(1_000);
        let handle = clock.clone();
        handle.advance_secs(2.5);
        assert_eq!(clock.now_millis(), 3_500);
        handle.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn seconds_between_never_goes_negative() {
        assert_eq!(seconds_between(5_000, 6_500), 1.5);
        assert_eq!(seconds_between(6_500, 5_000), 0.0);
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryTimestampStore::new();
        assert_eq!(store.load(), None);
        store.save(42);
        assert_eq!(store.load(), Some(42));
        assert_eq!(MemoryTimestampStore::with_saved(7).load(), Some(7));
    }

    #[test]
    fn system_time_is_after_epoch() {
        assert!(SystemTimeSource.now_millis() > 0);
    }
}
