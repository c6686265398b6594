//! Wall-clock access behind a capability trait.
//!
//! Engines never read the system time directly; they hold a `Clock` so tests
//! can pin "now" to an exact millisecond.

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> i64;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a fixed instant, settable from tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: std::sync::atomic::AtomicI64,
}

impl FixedClock {
    pub fn at(now_millis: i64) -> Self {
        Self {
            now: std::sync::atomic::AtomicI64::new(now_millis),
        }
    }

    /// Move the pinned time to a new instant.
    pub fn set(&self, now_millis: i64) {
        self.now
            .store(now_millis, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
