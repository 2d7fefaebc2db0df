//! Single-settlement deferred value and its chaining operators.
//!
//! A [`Promise`] is the observe-side handle to a value that settles exactly
//! once, either resolved with a `T` or rejected with a [`Failure`]. The
//! settle side is a separate capability, [`Deferred`], so producers and
//! consumers hold distinct halves:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    SETTLEMENT STATE MACHINE                  │
//! │                                                              │
//! │   Producer                              Consumer             │
//! │     │                                      │                 │
//! │     │── resolve(v) ──► Resolved ──flush──► then/pipe queue   │
//! │     │── reject(e)  ──► Rejected ──flush──► fail queue        │
//! │     │── (again)    ──► no-op                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - **Settle once**: the state leaves `Pending` at most once; later
//!   `resolve`/`reject` calls are silent no-ops
//! - **FIFO per queue**: continuations on one queue of one promise are
//!   scheduled in registration order
//! - **Never inline**: every continuation is handed to the scheduler port;
//!   registration and settlement never run a continuation on the caller's
//!   stack, even when the promise is already settled
//! - **Caught at the boundary**: a panic inside a `then`/`pipe`/`fail`
//!   callback becomes a rejection of the derived promise, never an unwind
//!   out of the scheduler

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, trace, warn};

use crate::error::Failure;
use crate::scheduler::SchedulerHandle;

/// Opaque identifier for a promise, used only in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromiseId(u64);

impl PromiseId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise-{}", self.0)
    }
}

/// A success continuation, invoked with a clone of the resolved value.
pub(crate) type Callback<T> = Box<dyn FnOnce(T) + Send>;
/// A failure continuation, invoked with a clone of the rejection payload.
pub(crate) type FailCallback = Box<dyn FnOnce(Failure) + Send>;

enum SettleState<T> {
    Pending,
    Resolved(T),
    Rejected(Failure),
}

struct Inner<T> {
    state: SettleState<T>,
    callbacks: VecDeque<Callback<T>>,
    fail_callbacks: VecDeque<FailCallback>,
    /// Upstream promise this one was derived from. Diagnostic only, never
    /// traversed, cleared on settlement.
    parent: Option<PromiseId>,
}

/// Observe-side handle to a deferred value.
///
/// Cloning is cheap and clones share the same underlying state. All
/// registration goes through the chaining operators ([`then`](Self::then),
/// [`pipe`](Self::pipe), [`fail`](Self::fail), [`always`](Self::always)),
/// each of which returns a new promise derived from this one.
pub struct Promise<T> {
    inner: Arc<Mutex<Inner<T>>>,
    scheduler: SchedulerHandle,
    id: PromiseId,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            scheduler: Arc::clone(&self.scheduler),
            id: self.id,
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.lock().state {
            SettleState::Pending => "pending",
            SettleState::Resolved(_) => "resolved",
            SettleState::Rejected(_) => "rejected",
        };
        f.debug_struct("Promise")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    pub(crate) fn new(scheduler: SchedulerHandle) -> Self {
        Self::with_parent(scheduler, None)
    }

    pub(crate) fn with_parent(scheduler: SchedulerHandle, parent: Option<PromiseId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SettleState::Pending,
                callbacks: VecDeque::new(),
                fail_callbacks: VecDeque::new(),
                parent,
            })),
            scheduler,
            id: PromiseId::next(),
        }
    }

    /// Constructs a promise born rejected, bypassing the unobserved-rejection
    /// diagnostic (there cannot be a listener yet by construction).
    pub(crate) fn already_rejected(scheduler: SchedulerHandle, failure: Failure) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SettleState::Rejected(failure),
                callbacks: VecDeque::new(),
                fail_callbacks: VecDeque::new(),
                parent: None,
            })),
            scheduler,
            id: PromiseId::next(),
        }
    }

    /// Diagnostic identifier of this promise.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.id
    }

    /// Upstream promise this one was derived from, until settlement clears it.
    #[must_use]
    pub fn parent_id(&self) -> Option<PromiseId> {
        self.inner.lock().parent
    }

    /// Returns true once the promise has left the pending state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self.inner.lock().state, SettleState::Pending)
    }

    /// Returns true if the promise settled successfully.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.lock().state, SettleState::Resolved(_))
    }

    /// Returns true if the promise settled with a failure.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.lock().state, SettleState::Rejected(_))
    }

    /// A clone of the resolved value, if the promise has resolved.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        match &self.inner.lock().state {
            SettleState::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// A clone of the rejection payload, if the promise has rejected.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        match &self.inner.lock().state {
            SettleState::Rejected(failure) => Some(failure.clone()),
            _ => None,
        }
    }

    pub(crate) fn settle_resolve(&self, value: T) {
        {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, SettleState::Pending) {
                return;
            }
            inner.state = SettleState::Resolved(value);
            inner.parent = None;
        }
        trace!(promise = %self.id, "resolved");
        self.flush();
    }

    pub(crate) fn settle_reject(&self, failure: Failure) {
        {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, SettleState::Pending) {
                return;
            }
            // Nobody listening on either queue: surface the rejection on the
            // diagnostic channel rather than dropping it silently. A listener
            // attaching on the very next statement makes this a false alarm,
            // which is why it logs instead of raising.
            if inner.callbacks.is_empty() && inner.fail_callbacks.is_empty() {
                error!(promise = %self.id, failure = %failure, "rejection with no registered continuations");
            }
            inner.state = SettleState::Rejected(failure);
            inner.parent = None;
        }
        trace!(promise = %self.id, "rejected");
        self.flush();
    }

    /// Queues a raw success continuation without flushing.
    pub(crate) fn push_ok(&self, callback: Callback<T>) {
        self.inner.lock().callbacks.push_back(callback);
    }

    /// Queues a raw failure continuation without flushing.
    pub(crate) fn push_fail(&self, callback: FailCallback) {
        self.inner.lock().fail_callbacks.push_back(callback);
    }

    /// Schedules every queued continuation for the settled channel.
    ///
    /// Continuations are removed from the queue before being handed to the
    /// scheduler, so a later flush cannot re-deliver them. Continuations on
    /// the opposite channel are dropped, since they can never fire. No-op
    /// while pending.
    pub(crate) fn flush(&self) {
        let mut inner = self.inner.lock();
        let outcome = match &inner.state {
            SettleState::Pending => return,
            SettleState::Resolved(value) => Ok(value.clone()),
            SettleState::Rejected(failure) => Err(failure.clone()),
        };
        match outcome {
            Ok(value) => {
                let drained = std::mem::take(&mut inner.callbacks);
                // The failure channel can never fire now; release its
                // continuations instead of holding them for the promise's
                // lifetime.
                inner.fail_callbacks.clear();
                drop(inner);
                for callback in drained {
                    let value = value.clone();
                    self.scheduler.schedule(Box::new(move || callback(value)));
                }
            }
            Err(failure) => {
                let drained = std::mem::take(&mut inner.fail_callbacks);
                inner.callbacks.clear();
                drop(inner);
                for callback in drained {
                    let failure = failure.clone();
                    self.scheduler.schedule(Box::new(move || callback(failure)));
                }
            }
        }
    }

    /// Derives a promise by transforming the resolved value.
    ///
    /// On resolution of `self`, `transform` runs (via the scheduler) and its
    /// return value resolves the derived promise; a panic inside `transform`
    /// rejects it instead. Rejection of `self` propagates to the derived
    /// promise untransformed.
    #[must_use]
    pub fn then<T2, F>(&self, transform: F) -> Promise<T2>
    where
        T2: Clone + Send + 'static,
        F: FnOnce(T) -> T2 + Send + 'static,
    {
        let out = Promise::with_parent(Arc::clone(&self.scheduler), Some(self.id));
        let on_fail = out.clone();
        self.push_fail(Box::new(move |failure| on_fail.settle_reject(failure)));
        let on_ok = out.clone();
        self.push_ok(Box::new(move |value| {
            match catch_unwind(AssertUnwindSafe(move || transform(value))) {
                Ok(mapped) => on_ok.settle_resolve(mapped),
                Err(payload) => on_ok.settle_reject(Failure::from_panic(payload)),
            }
        }));
        self.flush();
        out
    }

    /// Derives a promise by chaining into another promise-producing step.
    ///
    /// Like [`then`](Self::then), but `transform` returns a promise and the
    /// derived promise follows that nested promise's eventual settlement
    /// (one level of flattening). Rejection of `self` or of the nested
    /// promise propagates to the derived promise.
    #[must_use]
    pub fn pipe<T2, F>(&self, transform: F) -> Promise<T2>
    where
        T2: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<T2> + Send + 'static,
    {
        let out = Promise::with_parent(Arc::clone(&self.scheduler), Some(self.id));
        let on_fail = out.clone();
        self.push_fail(Box::new(move |failure| on_fail.settle_reject(failure)));
        let on_ok = out.clone();
        self.push_ok(Box::new(move |value| {
            match catch_unwind(AssertUnwindSafe(move || transform(value))) {
                Ok(nested) => nested.pump_into(&on_ok),
                Err(payload) => on_ok.settle_reject(Failure::from_panic(payload)),
            }
        }));
        self.flush();
        out
    }

    /// Derives a promise from the failure path.
    ///
    /// On rejection of `self`, `handler` runs and its return value resolves
    /// the derived promise (recovery); a panic inside `handler` rejects it.
    /// Resolution of `self` does not settle the derived promise through this
    /// operator.
    #[must_use]
    pub fn fail<T2, F>(&self, handler: F) -> Promise<T2>
    where
        T2: Clone + Send + 'static,
        F: FnOnce(Failure) -> T2 + Send + 'static,
    {
        let out = Promise::with_parent(Arc::clone(&self.scheduler), Some(self.id));
        let on_fail = out.clone();
        self.push_fail(Box::new(move |failure| {
            match catch_unwind(AssertUnwindSafe(move || handler(failure))) {
                Ok(recovered) => on_fail.settle_resolve(recovered),
                Err(payload) => on_fail.settle_reject(Failure::from_panic(payload)),
            }
        }));
        self.flush();
        out
    }

    /// Runs a side effect on either settlement path, returning `self`.
    ///
    /// The side effect's result is ignored; a panic inside it is logged and
    /// swallowed. Intended for cleanup-style continuations.
    pub fn always<F>(&self, side_effect: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let hook = Arc::new(Mutex::new(Some(side_effect)));
        let on_ok = Arc::clone(&hook);
        self.push_ok(Box::new(move |_| run_hook(&on_ok)));
        self.push_fail(Box::new(move |_| run_hook(&hook)));
        self.flush();
        self.clone()
    }

    /// Forwards this promise's eventual settlement into `out`.
    fn pump_into(&self, out: &Promise<T>) {
        let on_ok = out.clone();
        self.push_ok(Box::new(move |value| on_ok.settle_resolve(value)));
        let on_fail = out.clone();
        self.push_fail(Box::new(move |failure| on_fail.settle_reject(failure)));
        self.flush();
    }
}

fn run_hook<F: FnOnce()>(hook: &Mutex<Option<F>>) {
    let Some(side_effect) = hook.lock().take() else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(side_effect)).is_err() {
        warn!("always side effect panicked");
    }
}

/// Settlement capability bound to exactly one promise.
///
/// Holding a `Deferred` is the authority to settle its promise. Settlement
/// is one-shot: after the first `resolve` or `reject`, later calls are
/// silent no-ops.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    promise: Promise<T>,
}

impl<T: Clone + Send + 'static> Deferred<T> {
    pub(crate) fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            promise: Promise::new(scheduler),
        }
    }

    /// Settles the promise successfully. No-op if already settled.
    pub fn resolve(&self, value: T) {
        self.promise.settle_resolve(value);
    }

    /// Settles the promise with a failure. No-op if already settled.
    ///
    /// Rejecting while no continuation is registered on either queue emits
    /// an error-level diagnostic (the rejection would otherwise vanish).
    pub fn reject(&self, failure: Failure) {
        self.promise.settle_reject(failure);
    }

    /// Reports partial progress. Accepted but currently has no observable
    /// effect; retained as an extension point.
    pub fn progress(&self, fraction: f64) {
        trace!(promise = %self.promise.id(), fraction, "progress");
    }

    /// The observe-side handle governed by this capability.
    #[must_use]
    pub fn promise(&self) -> Promise<T> {
        self.promise.clone()
    }
}
