//! Deterministic macrotask/microtask scheduler.
//!
//! Models the ordering rules of a JavaScript-style event loop on a logical
//! clock:
//! - microtasks run FIFO and are drained to exhaustion, including the ones
//!   they spawn, before any macrotask runs;
//! - macrotasks run one per turn, ordered by `(due_time, sequence)`;
//! - a failing task is recorded in the [`RunReport`] and never aborts the run.

pub mod clock;
pub mod config;
pub mod error;
pub mod queue;
pub mod report;
pub mod scheduler;
pub mod task;
pub mod timers;

pub use clock::Clock;
pub use config::{SchedulerBuilder, SchedulerConfig};
pub use error::{SchedulerError, TaskExecutionError};
pub use queue::MicrotaskQueue;
pub use report::{RunOutcome, RunReport, RunState, SchedulerSnapshot, TaskFailure};
pub use scheduler::{Scheduler, WeakScheduler};
pub use task::{Action, Task, TaskId, TaskKind};
pub use timers::MacrotaskQueue;
