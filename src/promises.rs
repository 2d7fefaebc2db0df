//! The subsystem front door: constructors and combinator entry points.
//!
//! A [`Promises`] value owns the injected scheduler capability and is the
//! only way to mint promises. There is no process-wide scheduler cell:
//! construct the subsystem with the capability and every promise it creates
//! carries it, so "scheduler unset" is unrepresentable.
//!
//! ```
//! use std::sync::Arc;
//! use deferral::{LabScheduler, Promises};
//!
//! let lab = Arc::new(LabScheduler::new());
//! let promises = Promises::new(Arc::clone(&lab) as _);
//!
//! let out = promises.resolved(2).then(|v| v * 2);
//! lab.run_until_quiescent();
//! assert_eq!(out.value(), Some(4));
//! ```

use std::sync::Arc;

use crate::combinator::{self, Generator};
use crate::error::Failure;
use crate::promise::{Deferred, Promise};
use crate::scheduler::SchedulerHandle;

/// Boxed resolve capability handed to a [`Promises::create`] executor.
pub type ResolveFn<T> = Box<dyn Fn(T) + Send>;
/// Boxed reject capability handed to a [`Promises::create`] executor.
pub type RejectFn = Box<dyn Fn(Failure) + Send>;

/// Factory for promises bound to one injected scheduler.
///
/// Cheap to clone; clones share the same scheduler handle.
#[derive(Clone)]
pub struct Promises {
    scheduler: SchedulerHandle,
}

impl Promises {
    /// Creates a promise subsystem over the given scheduler capability.
    #[must_use]
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self { scheduler }
    }

    pub(crate) fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Mints a fresh pending promise and returns its settlement capability.
    #[must_use]
    pub fn deferred<T: Clone + Send + 'static>(&self) -> Deferred<T> {
        Deferred::new(Arc::clone(&self.scheduler))
    }

    /// Invokes `executor` synchronously with resolve/reject capabilities and
    /// returns the governed promise.
    ///
    /// The executor may settle immediately or stash the capabilities for a
    /// producer to use later; either way delivery to continuations goes
    /// through the scheduler.
    pub fn create<T, F>(&self, executor: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(ResolveFn<T>, RejectFn),
    {
        let deferred = self.deferred::<T>();
        let promise = deferred.promise();
        let on_ok = deferred.clone();
        executor(
            Box::new(move |value| on_ok.resolve(value)),
            Box::new(move |failure| deferred.reject(failure)),
        );
        promise
    }

    /// Alias for [`create`](Self::create), kept for API compatibility.
    pub fn invoke<T, F>(&self, executor: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(ResolveFn<T>, RejectFn),
    {
        self.create(executor)
    }

    /// An already-resolved promise. Continuations registered later are still
    /// delivered through the scheduler, never inline.
    #[must_use]
    pub fn resolved<T: Clone + Send + 'static>(&self, value: T) -> Promise<T> {
        let deferred = self.deferred();
        deferred.resolve(value);
        deferred.promise()
    }

    /// An already-rejected promise.
    ///
    /// Unlike rejecting through a [`Deferred`], constructing a rejected
    /// promise emits no unobserved-rejection diagnostic: by construction no
    /// listener can exist yet.
    #[must_use]
    pub fn rejected<T: Clone + Send + 'static>(&self, failure: Failure) -> Promise<T> {
        Promise::already_rejected(Arc::clone(&self.scheduler), failure)
    }

    /// A promise that never settles. Type-compatible placeholder for "no
    /// eventual settlement".
    #[must_use]
    pub fn forever<T: Clone + Send + 'static>(&self) -> Promise<T> {
        Promise::new(Arc::clone(&self.scheduler))
    }

    /// An already-resolved unit promise, useful as a fold seed when building
    /// chains iteratively.
    #[must_use]
    pub fn chain(&self) -> Promise<()> {
        self.resolved(())
    }

    /// Order-preserving join over `inputs`. See [`combinator::all()`].
    #[must_use]
    pub fn all<T: Clone + Send + 'static>(&self, inputs: Vec<Promise<T>>) -> Promise<Vec<T>> {
        combinator::all(self, inputs)
    }

    /// First settlement wins. See [`combinator::any()`].
    #[must_use]
    pub fn any<T: Clone + Send + 'static>(&self, inputs: Vec<Promise<T>>) -> Promise<T> {
        combinator::any(self, inputs)
    }

    /// Strictly ordered execution of promise generators. See
    /// [`combinator::sequence()`].
    #[must_use]
    pub fn sequence<T: Clone + Send + 'static>(
        &self,
        generators: Vec<Generator<T>>,
    ) -> Promise<Vec<T>> {
        combinator::sequence(self, generators)
    }
}

impl std::fmt::Debug for Promises {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promises").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::LabScheduler;

    fn lab() -> (Promises, Arc<LabScheduler>) {
        let scheduler = Arc::new(LabScheduler::new());
        (Promises::new(Arc::clone(&scheduler) as _), scheduler)
    }

    #[test]
    fn create_executor_runs_synchronously() {
        let (promises, lab) = lab();
        let out = promises.create(|resolve, _reject| resolve(9));
        // Executor already ran, but delivery still waits for the scheduler.
        assert!(out.is_resolved());
        lab.run_until_quiescent();
        assert_eq!(out.value(), Some(9));
    }

    #[test]
    fn create_reject_path() {
        let (promises, lab) = lab();
        let out = promises.create::<i32, _>(|_resolve, reject| {
            reject(Failure::new("producer gave up"));
        });
        let _tail = out.fail(|f| f.message().to_string());
        lab.run_until_quiescent();
        assert_eq!(out.failure().unwrap().message(), "producer gave up");
    }

    #[test]
    fn invoke_is_create() {
        let (promises, lab) = lab();
        let out = promises.invoke(|resolve, _reject| resolve("hi"));
        lab.run_until_quiescent();
        assert_eq!(out.value(), Some("hi"));
    }

    #[test]
    fn resolved_delivers_through_the_scheduler() {
        let (promises, lab) = lab();
        let out = promises.resolved(5).then(|v| v + 1);
        assert!(!out.is_settled());
        lab.run_until_quiescent();
        assert_eq!(out.value(), Some(6));
    }

    #[test]
    fn rejected_construction_feeds_fail_handlers() {
        let (promises, lab) = lab();
        let out = promises
            .rejected::<i32>(Failure::new("born broken"))
            .fail(|f| f.message().len());
        lab.run_until_quiescent();
        assert_eq!(out.value(), Some("born broken".len()));
    }

    #[test]
    fn forever_never_settles() {
        let (promises, lab) = lab();
        let out = promises.forever::<i32>().then(|v| v);
        lab.run_until_quiescent();
        assert!(!out.is_settled());
        assert_eq!(lab.pending(), 0);
    }

    #[test]
    fn chain_is_a_resolved_unit_seed() {
        let (promises, lab) = lab();
        let out = promises.chain().then(|()| 41).then(|v| v + 1);
        lab.run_until_quiescent();
        assert_eq!(out.value(), Some(42));
    }
}
