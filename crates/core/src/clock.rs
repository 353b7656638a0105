//! Time source and sort-weight generation.
//!
//! Both are injected into the services so tests can pin time and observe
//! weight assignment without touching global state.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{TimeDelta, Utc};

use crate::types::Timestamp;

/// Source of "now" for expiry and completion stamping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out strictly increasing sort weights derived from the clock's
/// nanosecond timestamp.
///
/// When the clock stalls or goes backwards the last issued weight is bumped
/// instead, so two calls never return the same value.
pub struct WeightGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl WeightGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// A single fresh weight.
    pub fn next(&self) -> i64 {
        self.reserve(1)
    }

    /// Reserve `count` consecutive weights and return the first.
    ///
    /// The caller assigns `base + index` for each position.
    pub fn reserve(&self, count: usize) -> i64 {
        let span = i64::try_from(count.max(1)).unwrap_or(i64::MAX);
        let now = self.clock.now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut base = now;
        // fetch_update retries until no other caller raced us. The closure
        // always returns Some, so the Err arm is unreachable.
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                base = now.max(last.saturating_add(1));
                Some(base.saturating_add(span - 1))
            })
            .unwrap_or_else(|v| v);
        base
    }
}

impl std::fmt::Debug for WeightGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightGenerator")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish()
    }
}
