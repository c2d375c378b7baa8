//! Scheduler configuration and the fluent builder around it.

use crate::scheduler::Scheduler;
use serde::{Deserialize, Serialize};

/// Settings for a [`Scheduler`]. Every field has a default, so partial
/// documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Initial logical clock value.
    pub start_time: u64,
    /// Maximum macrotasks a single `run()` executes before returning.
    pub turn_limit: Option<u64>,
    /// Record panicking actions as task failures instead of unwinding.
    pub catch_panics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_time: 0,
            turn_limit: None,
            catch_panics: true,
        }
    }
}

/// Builder for [`Scheduler`] instances.
///
/// ```
/// use microtick_scheduler::Scheduler;
///
/// let scheduler = Scheduler::builder().start_time(100).turn_limit(64).build();
/// assert_eq!(scheduler.now(), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_time(mut self, start_time: u64) -> Self {
        self.config.start_time = start_time;
        self
    }

    pub fn turn_limit(mut self, limit: u64) -> Self {
        self.config.turn_limit = Some(limit);
        self
    }

    /// When disabled, a panicking action unwinds out of `run()`.
    pub fn catch_panics(mut self, catch: bool) -> Self {
        self.config.catch_panics = catch;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn build(self) -> Scheduler {
        Scheduler::with_config(self.config)
    }
}

impl From<SchedulerConfig> for SchedulerBuilder {
    fn from(config: SchedulerConfig) -> Self {
        Self { config }
    }
}
