use crate::promise::{Outcome, Promise};
use crate::rejection::AggregateError;
use microtick_scheduler::Scheduler;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

impl<T: Clone + 'static> Promise<T> {
    /// A promise fulfilled with `value` by a macrotask `delay` time units
    /// from now.
    pub fn delay(scheduler: &Scheduler, delay: u64, value: T) -> Self {
        let promise = Self::pending(scheduler);
        let p = promise.clone();
        scheduler.enqueue_macrotask(delay, move || {
            p.resolve(value);
            Ok(())
        });
        promise
    }

    /// Fulfils with every value, in input order, once all inputs fulfil.
    /// The first rejection rejects the aggregate. Empty input fulfils
    /// immediately.
    pub fn all(scheduler: &Scheduler, promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
        let aggregate = Promise::pending(scheduler);
        if promises.is_empty() {
            aggregate.resolve(Vec::new());
            return aggregate;
        }

        let values: Rc<RefCell<Vec<Option<T>>>> =
            Rc::new(RefCell::new((0..promises.len()).map(|_| None).collect()));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.iter().enumerate() {
            let values = values.clone();
            let remaining = remaining.clone();
            let aggregate = aggregate.clone();
            promise.subscribe(Box::new(move |outcome: Outcome<T>| match outcome {
                Ok(value) => {
                    values.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let collected = values.borrow_mut().drain(..).flatten().collect();
                        aggregate.resolve(collected);
                    }
                }
                Err(reason) => {
                    aggregate.settle(Err(reason));
                }
            }));
        }
        aggregate
    }

    /// Settles like whichever input settles first. Empty input stays
    /// pending forever.
    pub fn race(scheduler: &Scheduler, promises: Vec<Promise<T>>) -> Promise<T> {
        let winner = Promise::pending(scheduler);
        for promise in &promises {
            let winner = winner.clone();
            promise.subscribe(Box::new(move |outcome: Outcome<T>| {
                winner.settle(outcome);
            }));
        }
        winner
    }

    /// Fulfils with every outcome, in input order, once all inputs settle.
    /// Never rejects.
    pub fn all_settled(
        scheduler: &Scheduler,
        promises: Vec<Promise<T>>,
    ) -> Promise<Vec<Outcome<T>>> {
        let aggregate = Promise::pending(scheduler);
        if promises.is_empty() {
            aggregate.resolve(Vec::new());
            return aggregate;
        }

        let outcomes: Rc<RefCell<Vec<Option<Outcome<T>>>>> =
            Rc::new(RefCell::new((0..promises.len()).map(|_| None).collect()));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.iter().enumerate() {
            let outcomes = outcomes.clone();
            let remaining = remaining.clone();
            let aggregate = aggregate.clone();
            promise.subscribe(Box::new(move |outcome: Outcome<T>| {
                outcomes.borrow_mut()[index] = Some(outcome);
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let collected = outcomes.borrow_mut().drain(..).flatten().collect();
                    aggregate.resolve(collected);
                }
            }));
        }
        aggregate
    }

    /// Fulfils like the first input to fulfil. Rejects with an
    /// [`AggregateError`] only once every input has rejected; empty input
    /// rejects immediately.
    pub fn any(scheduler: &Scheduler, promises: Vec<Promise<T>>) -> Promise<T> {
        let winner = Promise::pending(scheduler);
        if promises.is_empty() {
            winner.reject(anyhow::Error::new(AggregateError { errors: Vec::new() }));
            return winner;
        }

        let errors: Rc<RefCell<Vec<Option<String>>>> =
            Rc::new(RefCell::new((0..promises.len()).map(|_| None).collect()));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.iter().enumerate() {
            let errors = errors.clone();
            let remaining = remaining.clone();
            let winner = winner.clone();
            promise.subscribe(Box::new(move |outcome: Outcome<T>| match outcome {
                Ok(value) => {
                    winner.resolve(value);
                }
                Err(reason) => {
                    errors.borrow_mut()[index] = Some(reason.to_string());
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let errors = errors.borrow_mut().drain(..).flatten().collect();
                        winner.reject(anyhow::Error::new(AggregateError { errors }));
                    }
                }
            }));
        }
        winner
    }
}
