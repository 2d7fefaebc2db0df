//! Sequence combinator: strictly ordered, one promise in flight at a time.
//!
//! ```text
//! sequence([g0, g1, g2]):
//!   tick ─► g0() ─► p0 resolves ─► g1() ─► p1 resolves ─► g2() ─► p2
//!   resolves ─► resolve [v0, v1, v2]
//!                        p1 rejects ─► reject aggregate, g2 never invoked
//! ```
//!
//! # Invariants
//!
//! - **Strict order**: generator N+1 is invoked only after generator N's
//!   promise has resolved
//! - **Abort on failure**: the first rejection rejects the aggregate and no
//!   further generator is invoked
//! - **Empty identity**: `sequence([])` resolves with `[]`
//!
//! The first generator runs one scheduler tick after the call, so the
//! combinator itself never blocks or runs caller code inline.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Failure;
use crate::promise::{Deferred, Promise};
use crate::promises::Promises;

/// A deferred producer of a promise, invoked when its turn in the sequence
/// comes up.
pub type Generator<T> = Box<dyn FnOnce() -> Promise<T> + Send>;

struct SequenceState<T> {
    generators: VecDeque<Generator<T>>,
    values: Vec<T>,
}

/// Runs `generators` one at a time, collecting resolved values in order.
///
/// Generators after the first failure are never invoked. A panic inside a
/// generator rejects the aggregate the same way a rejected promise does.
#[must_use]
pub fn sequence<T>(promises: &Promises, generators: Vec<Generator<T>>) -> Promise<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let deferred = promises.deferred::<Vec<T>>();
    let out = deferred.promise();
    if generators.is_empty() {
        deferred.resolve(Vec::new());
        return out;
    }

    let state = Arc::new(Mutex::new(SequenceState {
        generators: generators.into_iter().collect(),
        values: Vec::new(),
    }));

    promises
        .scheduler()
        .schedule(Box::new(move || step(&state, &deferred)));

    out
}

/// Pops and runs the next generator, wiring its promise back into `step`.
fn step<T>(state: &Arc<Mutex<SequenceState<T>>>, deferred: &Deferred<Vec<T>>)
where
    T: Clone + Send + 'static,
{
    let generator = {
        let mut seq = state.lock();
        match seq.generators.pop_front() {
            Some(generator) => generator,
            None => {
                let values = std::mem::take(&mut seq.values);
                drop(seq);
                deferred.resolve(values);
                return;
            }
        }
    };

    let promise = match catch_unwind(AssertUnwindSafe(generator)) {
        Ok(promise) => promise,
        Err(payload) => {
            deferred.reject(Failure::from_panic(payload));
            return;
        }
    };

    let next_state = Arc::clone(state);
    let next_deferred = deferred.clone();
    promise.push_ok(Box::new(move |value| {
        next_state.lock().values.push(value);
        step(&next_state, &next_deferred);
    }));
    let on_fail = deferred.clone();
    promise.push_fail(Box::new(move |failure| on_fail.reject(failure)));
    promise.flush();
}
