//! Deferral: deferred-value (promise) primitives over an injected scheduler.
//!
//! # Overview
//!
//! A promise is a container for the eventual result of an asynchronous
//! computation. Consumers register continuations ("when this value becomes
//! available, do X") instead of blocking a thread; producers settle the
//! container exactly once through a separate capability. Combinators join,
//! race, and chain many such containers into aggregate workflows.
//!
//! # Core Guarantees
//!
//! - **Settle once**: a promise leaves `Pending` at most once; later
//!   settlement calls are silent no-ops
//! - **Never inline**: every continuation dispatch goes through the
//!   injected scheduler, at least one tick past the triggering settlement —
//!   callers never observe reentrant continuation execution
//! - **FIFO per queue**: continuations on one promise's success (or
//!   failure) queue fire in registration order
//! - **Caught at the boundary**: panics inside transform and recovery
//!   callbacks become rejections of the derived promise
//! - **No ambient authority**: the scheduler is a constructor-injected
//!   capability, not a process-wide cell
//!
//! # Module Structure
//!
//! - [`error`]: the opaque [`Failure`] payload carried by rejections
//! - [`scheduler`]: the [`Schedule`] port and the deterministic
//!   [`LabScheduler`] for tests
//! - [`promise`]: the settlement state machine, [`Promise`] and
//!   [`Deferred`], and the chaining operators
//! - [`combinator`]: `all`, `any`, `sequence`
//! - [`promises`]: the [`Promises`] front door holding the injected
//!   scheduler
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deferral::{Failure, LabScheduler, Promises};
//!
//! let lab = Arc::new(LabScheduler::new());
//! let promises = Promises::new(Arc::clone(&lab) as _);
//!
//! let out = promises
//!     .rejected::<i32>(Failure::new("flaky backend"))
//!     .fail(|_| 42)
//!     .then(|v| v * 2);
//!
//! lab.run_until_quiescent();
//! assert_eq!(out.value(), Some(84));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod combinator;
pub mod error;
pub mod promise;
pub mod promises;
pub mod scheduler;

pub use combinator::{all, any, sequence, Generator};
pub use error::Failure;
pub use promise::{Deferred, Promise, PromiseId};
pub use promises::{Promises, RejectFn, ResolveFn};
pub use scheduler::{Job, LabScheduler, Schedule, SchedulerHandle};
