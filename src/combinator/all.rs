//! Join combinator: wait for every input, preserve input order.
//!
//! ```text
//! all([p0, p1, p2]):
//!   p1 resolves ─► slot[1] filled
//!   p0 resolves ─► slot[0] filled
//!   p2 resolves ─► slot[2] filled, all done ─► resolve [v0, v1, v2]
//! ```
//!
//! # Invariants
//!
//! - **Order preservation**: the aggregate vector follows input order, not
//!   settlement order
//! - **First failure wins**: any input rejection rejects the aggregate with
//!   that failure; later settlements of other inputs are ignored
//! - **Empty identity**: `all([])` resolves with `[]` (via the scheduler,
//!   like every other delivery)

use std::sync::Arc;

use parking_lot::Mutex;

use crate::promise::Promise;
use crate::promises::Promises;

struct JoinState<T> {
    slots: Vec<Option<T>>,
    done: usize,
}

/// Joins `inputs` into one promise of all their values, in input order.
///
/// Rejects with the first failure observed among the inputs. Unsettled
/// inputs keep running; their eventual settlement is simply ignored.
#[must_use]
pub fn all<T>(promises: &Promises, inputs: Vec<Promise<T>>) -> Promise<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let total = inputs.len();
    let deferred = promises.deferred::<Vec<T>>();
    let out = deferred.promise();
    if total == 0 {
        deferred.resolve(Vec::new());
        return out;
    }

    let state = Arc::new(Mutex::new(JoinState {
        slots: (0..total).map(|_| None).collect(),
        done: 0,
    }));

    for (index, input) in inputs.iter().enumerate() {
        let state = Arc::clone(&state);
        let on_ok = deferred.clone();
        input.push_ok(Box::new(move |value| {
            let complete = {
                let mut join = state.lock();
                join.slots[index] = Some(value);
                join.done += 1;
                if join.done == join.slots.len() {
                    Some(join.slots.iter_mut().filter_map(Option::take).collect())
                } else {
                    None
                }
            };
            if let Some(values) = complete {
                on_ok.resolve(values);
            }
        }));
        let on_fail = deferred.clone();
        input.push_fail(Box::new(move |failure| on_fail.reject(failure)));
        input.flush();
    }

    out
}
