use crate::error::SchedulerError;
use std::cell::Cell;

/// Logical, monotonically non-decreasing time source.
///
/// Only the scheduler moves it forward; nothing here reads wall-clock time.
#[derive(Debug, Default)]
pub struct Clock {
    now: Cell<u64>,
}

impl Clock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Moves the clock to `t`. Moving backwards is rejected.
    pub fn advance_to(&self, t: u64) -> Result<(), SchedulerError> {
        let now = self.now.get();
        if t < now {
            return Err(SchedulerError::InvalidTime { requested: t, now });
        }
        if t > now {
            tracing::debug!("Clock advanced from {} to {}", now, t);
        }
        self.now.set(t);
        Ok(())
    }
}
