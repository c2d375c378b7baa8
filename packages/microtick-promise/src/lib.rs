//! Promise continuations on top of [`microtick_scheduler`].
//!
//! Settled-promise reactions are queued as microtasks, so they always run
//! before the next timer:
//!
//! ```
//! use microtick_promise::Promise;
//! use microtick_scheduler::Scheduler;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let scheduler = Scheduler::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = log.clone();
//! scheduler.enqueue_macrotask(0, move || {
//!     l.borrow_mut().push("setTimeout".to_string());
//!     Ok(())
//! });
//! let l = log.clone();
//! Promise::resolved(&scheduler, "Promise resolved".to_string()).then(move |res| {
//!     l.borrow_mut().push(res);
//!     Ok(())
//! });
//!
//! scheduler.run().unwrap();
//! assert_eq!(*log.borrow(), vec!["Promise resolved", "setTimeout"]);
//! ```

pub mod combinators;
pub mod promise;
pub mod rejection;

pub use promise::{Outcome, Promise, PromiseState, Resolver};
pub use rejection::{AggregateError, Rejection};
