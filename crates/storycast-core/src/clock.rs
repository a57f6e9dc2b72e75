//! Time source for duplicate windows and session timestamps.
//!
//! Everything time-dependent holds an `Arc<dyn Clock>`, so tests can step
//! time by hand instead of sleeping.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used by the relay and real clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
