use crate::clock::Clock;
use crate::config::{SchedulerBuilder, SchedulerConfig};
use crate::error::{SchedulerError, TaskExecutionError};
use crate::queue::MicrotaskQueue;
use crate::report::{RunOutcome, RunReport, RunState, SchedulerSnapshot, TaskFailure};
use crate::task::{Task, TaskId, TaskKind};
use crate::timers::MacrotaskQueue;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

struct Shared {
    config: SchedulerConfig,
    clock: Clock,
    microtasks: MicrotaskQueue,
    macrotasks: MacrotaskQueue,
    next_sequence: Cell<u64>,
    state: Cell<RunState>,
    stop_requested: Cell<bool>,
    // Report of the run in progress; handed out when `run()` returns.
    report: RefCell<RunReport>,
    total_executed: Cell<u64>,
    total_failed: Cell<u64>,
}

/// Deterministic single-threaded event loop.
///
/// `Scheduler` is a cheap handle: clone it into task actions so they can
/// enqueue follow-up work, cancel timers or request a stop while the loop is
/// running. All clones drive the same queues.
///
/// Each turn drains every pending microtask (including ones spawned during
/// the drain) and then runs at most one macrotask, picked by
/// `(due_time, sequence)` on a logical clock.
///
/// ```
/// use microtick_scheduler::Scheduler;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let l = log.clone();
/// scheduler.enqueue_macrotask(0, move || {
///     l.borrow_mut().push("timeout");
///     Ok(())
/// });
/// let l = log.clone();
/// scheduler.enqueue_microtask(move || {
///     l.borrow_mut().push("promise");
///     Ok(())
/// });
///
/// scheduler.run().unwrap();
/// assert_eq!(*log.borrow(), vec!["promise", "timeout"]);
/// ```
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<Shared>,
}

/// Non-owning handle to a [`Scheduler`].
///
/// Work queued on a scheduler that holds a strong handle back to it forms a
/// reference cycle; capture a `WeakScheduler` instead so dropping the last
/// `Scheduler` frees the queues.
#[derive(Clone, Default)]
pub struct WeakScheduler {
    shared: Weak<Shared>,
}

impl WeakScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` once every strong handle is gone.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.shared.upgrade().map(|shared| Scheduler { shared })
    }
}

impl fmt::Debug for WeakScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScheduler")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Puts the scheduler back to `Idle` if `run()` exits early, either through
/// `?` or by unwinding out of an action.
struct RunGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.shared.state.get() == RunState::Running {
            self.shared.state.set(RunState::Idle);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        tracing::debug!("Creating scheduler with {:?}", config);
        Self {
            shared: Rc::new(Shared {
                clock: Clock::new(config.start_time),
                config,
                microtasks: MicrotaskQueue::new(),
                macrotasks: MacrotaskQueue::new(),
                next_sequence: Cell::new(0),
                state: Cell::new(RunState::Idle),
                stop_requested: Cell::new(false),
                report: RefCell::new(RunReport::new()),
                total_executed: Cell::new(0),
                total_failed: Cell::new(0),
            }),
        }
    }

    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn now(&self) -> u64 {
        self.shared.clock.now()
    }

    pub fn state(&self) -> RunState {
        self.shared.state.get()
    }

    /// True when neither queue holds any work.
    pub fn is_idle(&self) -> bool {
        self.shared.microtasks.is_empty() && self.shared.macrotasks.is_empty()
    }

    /// Schedules `action` to run `delay` logical time units from now.
    pub fn enqueue_macrotask<F>(&self, delay: u64, action: F) -> TaskId
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let shared = &*self.shared;
        let (id, sequence) = self.next_id();
        let due_time = shared.clock.now().saturating_add(delay);
        tracing::trace!("Enqueued macrotask {} due at {}", id, due_time);
        shared.macrotasks.enqueue(Task::new(
            id,
            TaskKind::Macro,
            due_time,
            sequence,
            Box::new(action),
        ));
        id
    }

    /// Schedules `action` to run before the next macrotask.
    pub fn enqueue_microtask<F>(&self, action: F) -> TaskId
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let shared = &*self.shared;
        let (id, sequence) = self.next_id();
        tracing::trace!("Enqueued microtask {}", id);
        shared.microtasks.enqueue(Task::new(
            id,
            TaskKind::Micro,
            shared.clock.now(),
            sequence,
            Box::new(action),
        ));
        id
    }

    /// Cancels a pending macrotask.
    ///
    /// Returns `false` for microtasks, unknown ids and tasks that already ran
    /// or are running.
    pub fn cancel(&self, id: TaskId) -> bool {
        let removed = self.shared.macrotasks.cancel(id);
        tracing::trace!("Cancel {} -> {}", id, removed);
        removed
    }

    /// Asks the loop to halt once the current microtask drain finishes.
    ///
    /// The request is consumed by the next `run()` that observes it; a later
    /// `run()` resumes with whatever is still queued.
    pub fn stop(&self) {
        tracing::debug!("Stop requested at t={}", self.now());
        self.shared.stop_requested.set(true);
    }

    /// Drops every queued task without running it and returns how many were
    /// discarded.
    ///
    /// Actions that capture a strong `Scheduler` keep it alive; call this
    /// before dropping a scheduler that still has work queued.
    pub fn clear(&self) -> usize {
        let shared = &*self.shared;
        let cleared = shared.microtasks.clear() + shared.macrotasks.clear();
        tracing::debug!("Cleared {} pending tasks at t={}", cleared, self.now());
        cleared
    }

    /// Runs the loop until both queues are empty, a stop is requested or the
    /// turn limit is reached.
    ///
    /// Failing actions never abort the run; they show up in
    /// [`RunReport::failures`].
    pub fn run(&self) -> Result<RunReport, SchedulerError> {
        let shared = &*self.shared;
        if shared.state.get() == RunState::Running {
            return Err(SchedulerError::AlreadyRunning);
        }
        shared.state.set(RunState::Running);
        let _guard = RunGuard { shared };
        *shared.report.borrow_mut() = RunReport::new();

        tracing::info!(
            "Run started at t={} ({} microtasks, {} macrotasks pending)",
            shared.clock.now(),
            shared.microtasks.len(),
            shared.macrotasks.len()
        );

        let mut turns: u64 = 0;
        let outcome = loop {
            self.drain_microtasks();

            if shared.stop_requested.replace(false) {
                break RunOutcome::Stopped;
            }

            let Some(due) = shared.macrotasks.peek_next_due_time() else {
                break RunOutcome::Drained;
            };

            if shared.config.turn_limit.is_some_and(|limit| turns >= limit) {
                tracing::warn!("Turn limit of {} reached", turns);
                break RunOutcome::TurnLimitReached;
            }

            shared.clock.advance_to(due.max(shared.clock.now()))?;

            if let Some(task) = shared.macrotasks.pop_next_due(shared.clock.now()) {
                self.execute(task);
                turns += 1;
            }
        };

        shared.state.set(match outcome {
            RunOutcome::Drained => RunState::Drained,
            RunOutcome::Stopped | RunOutcome::TurnLimitReached => RunState::Idle,
        });

        let mut report = shared.report.replace(RunReport::new());
        report.outcome = outcome;
        report.final_time = shared.clock.now();

        tracing::info!(
            "Run finished: {:?} after {} tasks ({} failed) at t={}",
            report.outcome,
            report.executed.len(),
            report.failures.len(),
            report.final_time
        );
        Ok(report)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let shared = &*self.shared;
        SchedulerSnapshot {
            now: shared.clock.now(),
            state: shared.state.get(),
            pending_microtasks: shared.microtasks.len(),
            pending_macrotasks: shared.macrotasks.len(),
            next_due_time: shared.macrotasks.peek_next_due_time(),
            total_executed: shared.total_executed.get(),
            total_failed: shared.total_failed.get(),
        }
    }

    fn next_id(&self) -> (TaskId, u64) {
        let sequence = self.shared.next_sequence.get();
        self.shared.next_sequence.set(sequence + 1);
        (TaskId::new(sequence), sequence)
    }

    fn drain_microtasks(&self) {
        let drained = self.shared.microtasks.drain(|task| self.execute(task));
        if drained > 0 {
            tracing::trace!("Drained {} microtasks", drained);
        }
    }

    fn execute(&self, task: Task) {
        let shared = &*self.shared;
        let (id, kind) = (task.id, task.kind);
        tracing::trace!("Running {} ({:?}) at t={}", id, kind, shared.clock.now());

        let result = if shared.config.catch_panics {
            match catch_unwind(AssertUnwindSafe(|| task.run())) {
                Ok(result) => result.map_err(|e| TaskExecutionError::from_error(&e)),
                Err(payload) => Err(TaskExecutionError::from_panic(&*payload)),
            }
        } else {
            task.run().map_err(|e| TaskExecutionError::from_error(&e))
        };

        shared.total_executed.set(shared.total_executed.get() + 1);
        let mut report = shared.report.borrow_mut();
        report.executed.push(id);
        if let Err(error) = result {
            tracing::warn!("{} ({:?}) failed: {}", id, kind, error);
            shared.total_failed.set(shared.total_failed.get() + 1);
            report.failures.push(TaskFailure { id, kind, error });
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
