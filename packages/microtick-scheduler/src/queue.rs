use crate::task::Task;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Strict FIFO queue of microtasks.
///
/// The scheduler is single-threaded, so a `RefCell<VecDeque>` is enough. The
/// borrow is released before each task runs, which lets a running microtask
/// push onto the queue that is currently being drained.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: RefCell<VecDeque<Task>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn enqueue(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    pub fn pop(&self) -> Option<Task> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.queue.borrow_mut());
        removed.len()
    }

    /// Runs tasks until the queue is empty, including tasks appended while
    /// draining. Returns how many tasks were handed to `run`.
    pub fn drain(&self, mut run: impl FnMut(Task)) -> usize {
        let mut drained = 0;
        // Pop one at a time: the emptiness check must see tasks spawned by the
        // previous one.
        while let Some(task) = self.pop() {
            run(task);
            drained += 1;
        }
        drained
    }
}
