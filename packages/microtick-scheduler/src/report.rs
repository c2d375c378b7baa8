use crate::error::TaskExecutionError;
use crate::task::{TaskId, TaskKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Drained,
}

/// Why a call to `run()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Both queues are empty.
    Drained,
    /// `stop()` was requested by a task or by the host.
    Stopped,
    /// The configured turn limit was hit with macrotasks still pending.
    TurnLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub id: TaskId,
    pub kind: TaskKind,
    pub error: TaskExecutionError,
}

/// Result of a single `run()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Every task that was invoked, in execution order, including those that
    /// failed.
    pub executed: Vec<TaskId>,
    pub failures: Vec<TaskFailure>,
    pub outcome: RunOutcome,
    pub final_time: u64,
}

impl RunReport {
    pub(crate) fn new() -> Self {
        Self {
            executed: Vec::new(),
            failures: Vec::new(),
            outcome: RunOutcome::Drained,
            final_time: 0,
        }
    }

    pub fn failure(&self, id: TaskId) -> Option<&TaskExecutionError> {
        self.failures.iter().find(|f| f.id == id).map(|f| &f.error)
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.executed.iter().position(|&t| t == id)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Point-in-time view of a scheduler, for hosts that want to expose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub now: u64,
    pub state: RunState,
    pub pending_microtasks: usize,
    pub pending_macrotasks: usize,
    pub next_due_time: Option<u64>,
    pub total_executed: u64,
    pub total_failed: u64,
}
