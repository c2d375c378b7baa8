use crate::rejection::Rejection;
use microtick_scheduler::{Scheduler, WeakScheduler};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type Outcome<T> = Result<T, Rejection>;

type Reaction<T> = Box<dyn FnOnce(Outcome<T>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

enum Slot<T> {
    Pending(Vec<Reaction<T>>),
    Settled(Outcome<T>),
}

/// A single-assignment value whose continuations run as microtasks.
///
/// Settling a promise never runs reactions inline: each registered reaction
/// is queued on the scheduler's microtask queue, in registration order.
/// Reactions registered after settlement are queued immediately.
///
/// A reaction that panics is recorded by the scheduler as a task failure and
/// leaves its derived promise pending.
///
/// A promise only holds a weak handle to its scheduler, so promises captured
/// by queued tasks do not keep the scheduler alive. Reactions that become
/// due after the scheduler is dropped are discarded.
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
    scheduler: WeakScheduler,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    pub fn pending(scheduler: &Scheduler) -> Self {
        Self::attached(scheduler.downgrade())
    }

    fn attached(scheduler: WeakScheduler) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Pending(Vec::new()))),
            scheduler,
        }
    }

    /// Creates a promise and runs `executor` synchronously with a handle to
    /// it. An `Err` from the executor rejects the promise unless it was
    /// already settled.
    pub fn new<F>(scheduler: &Scheduler, executor: F) -> Self
    where
        F: FnOnce(Resolver<T>) -> anyhow::Result<()>,
    {
        let promise = Self::pending(scheduler);
        if let Err(err) = executor(Resolver {
            promise: promise.clone(),
        }) {
            promise.reject(err);
        }
        promise
    }

    pub fn resolved(scheduler: &Scheduler, value: T) -> Self {
        let promise = Self::pending(scheduler);
        promise.resolve(value);
        promise
    }

    pub fn rejected(scheduler: &Scheduler, reason: anyhow::Error) -> Self {
        let promise = Self::pending(scheduler);
        promise.reject(reason);
        promise
    }

    /// The scheduler reactions run on, if it is still alive.
    pub fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.upgrade()
    }

    /// Fulfils the promise. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the promise. Returns `false` if it was already settled.
    pub fn reject(&self, reason: anyhow::Error) -> bool {
        self.settle(Err(Rejection::from(reason)))
    }

    pub(crate) fn settle(&self, outcome: Outcome<T>) -> bool {
        let reactions = {
            let mut slot = self.slot.borrow_mut();
            let Slot::Pending(reactions) = &mut *slot else {
                return false;
            };
            let reactions = std::mem::take(reactions);
            *slot = Slot::Settled(outcome.clone());
            reactions
        };

        if let Err(reason) = &outcome {
            if reactions.is_empty() {
                tracing::debug!("Promise rejected with no handlers yet: {}", reason);
            }
        }
        for reaction in reactions {
            self.queue_reaction(reaction, outcome.clone());
        }
        true
    }

    pub(crate) fn subscribe(&self, reaction: Reaction<T>) {
        let outcome = {
            let mut slot = self.slot.borrow_mut();
            match &mut *slot {
                Slot::Pending(reactions) => {
                    reactions.push(reaction);
                    return;
                }
                Slot::Settled(outcome) => outcome.clone(),
            }
        };
        self.queue_reaction(reaction, outcome);
    }

    fn queue_reaction(&self, reaction: Reaction<T>, outcome: Outcome<T>) {
        let Some(scheduler) = self.scheduler.upgrade() else {
            tracing::debug!("Scheduler dropped; discarding promise reaction");
            return;
        };
        scheduler.enqueue_microtask(move || {
            reaction(outcome);
            Ok(())
        });
    }

    /// Chains `on_fulfilled`; a rejection skips it and flows to the returned
    /// promise unchanged.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> anyhow::Result<U> + 'static,
    {
        let derived = Promise::attached(self.scheduler.clone());
        let d = derived.clone();
        self.subscribe(Box::new(move |outcome: Outcome<T>| {
            let next = match outcome {
                Ok(value) => on_fulfilled(value).map_err(Rejection::from),
                Err(reason) => Err(reason),
            };
            d.settle(next);
        }));
        derived
    }

    /// Handles a rejection; a fulfilment passes through untouched.
    pub fn catch<F>(&self, on_rejected: F) -> Promise<T>
    where
        F: FnOnce(Rejection) -> anyhow::Result<T> + 'static,
    {
        let derived = Promise::attached(self.scheduler.clone());
        let d = derived.clone();
        self.subscribe(Box::new(move |outcome: Outcome<T>| {
            let next = match outcome {
                Ok(value) => Ok(value),
                Err(reason) => on_rejected(reason).map_err(Rejection::from),
            };
            d.settle(next);
        }));
        derived
    }

    /// Runs `on_settled` on either outcome and passes the outcome through,
    /// unless `on_settled` itself fails.
    pub fn finally<F>(&self, on_settled: F) -> Promise<T>
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let derived = Promise::attached(self.scheduler.clone());
        let d = derived.clone();
        self.subscribe(Box::new(move |outcome: Outcome<T>| {
            let next = match on_settled() {
                Ok(()) => outcome,
                Err(err) => Err(Rejection::from(err)),
            };
            d.settle(next);
        }));
        derived
    }

    pub fn state(&self) -> PromiseState {
        match &*self.slot.borrow() {
            Slot::Pending(_) => PromiseState::Pending,
            Slot::Settled(Ok(_)) => PromiseState::Fulfilled,
            Slot::Settled(Err(_)) => PromiseState::Rejected,
        }
    }

    pub fn value(&self) -> Option<T> {
        match &*self.slot.borrow() {
            Slot::Settled(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<Rejection> {
        match &*self.slot.borrow() {
            Slot::Settled(Err(reason)) => Some(reason.clone()),
            _ => None,
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Settlement handle passed to the executor of [`Promise::new`].
pub struct Resolver<T> {
    promise: Promise<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    pub fn resolve(&self, value: T) -> bool {
        self.promise.resolve(value)
    }

    pub fn reject(&self, reason: anyhow::Error) -> bool {
        self.promise.reject(reason)
    }
}
