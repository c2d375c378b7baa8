use crate::task::{Task, TaskId};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    by_key: BTreeMap<(u64, u64), Task>,
    index: FxHashMap<TaskId, (u64, u64)>,
}

/// Pending macrotasks ordered by `(due_time, sequence)`.
///
/// Equal due times fall back to the sequence number, so a zero-delay timer
/// queued first also fires first. Cancellation removes the entry outright.
#[derive(Debug, Default)]
pub struct MacrotaskQueue {
    inner: RefCell<Inner>,
}

impl MacrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, task: Task) {
        let key = task.key();
        let mut inner = self.inner.borrow_mut();
        inner.index.insert(task.id, key);
        inner.by_key.insert(key, task);
    }

    /// Pops the earliest task if it is due at `current_time`.
    pub fn pop_next_due(&self, current_time: u64) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.by_key.first_entry()?;
        if entry.key().0 > current_time {
            return None;
        }
        let task = entry.remove();
        inner.index.remove(&task.id);
        Some(task)
    }

    pub fn peek_next_due_time(&self) -> Option<u64> {
        self.inner
            .borrow()
            .by_key
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    /// Removes a pending task. Returns `false` when the id is unknown or the
    /// task already left the queue.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(key) = inner.index.remove(&id) else {
            return false;
        };
        inner.by_key.remove(&key).is_some()
    }

    /// Removes every pending task and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.inner.borrow_mut());
        // Tasks are dropped here, after the borrow ends.
        removed.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().by_key.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().by_key.len()
    }
}
