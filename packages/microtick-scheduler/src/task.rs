use serde::Serialize;
use std::fmt;

/// The callable carried by a task.
///
/// Actions run to completion; an `Err` is recorded against the task and the
/// loop moves on.
pub type Action = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Identifier of a task, unique per scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Timer-like work, ordered by `(due_time, sequence)`.
    Macro,
    /// Promise-continuation-like work, drained FIFO before the next macrotask.
    Micro,
}

/// A unit of work owned by whichever queue currently holds it.
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub due_time: u64,
    pub sequence: u64,
    action: Action,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind, due_time: u64, sequence: u64, action: Action) -> Self {
        Self {
            id,
            kind,
            due_time,
            sequence,
            action,
        }
    }

    /// Ordering key inside the macrotask queue.
    pub fn key(&self) -> (u64, u64) {
        (self.due_time, self.sequence)
    }

    /// Consumes the task and invokes its action.
    pub fn run(self) -> anyhow::Result<()> {
        (self.action)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("due_time", &self.due_time)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
