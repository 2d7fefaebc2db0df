//! Race combinator: first settlement wins, across both channels.
//!
//! Every input is wired straight into the aggregate's settlement capability;
//! the settle-once state machine makes the first arrival win and turns every
//! later arrival into a no-op. Losers are not cancelled — they keep running
//! and their settlements are ignored.

use crate::promise::Promise;
use crate::promises::Promises;

/// Races `inputs`: the aggregate takes the first settlement it sees.
///
/// A success resolves it, a failure rejects it, whichever lands first.
/// With no inputs the aggregate is permanently pending (nothing can ever
/// settle it).
#[must_use]
pub fn any<T>(promises: &Promises, inputs: Vec<Promise<T>>) -> Promise<T>
where
    T: Clone + Send + 'static,
{
    let deferred = promises.deferred::<T>();
    let out = deferred.promise();
    for input in &inputs {
        let on_ok = deferred.clone();
        input.push_ok(Box::new(move |value| on_ok.resolve(value)));
        let on_fail = deferred.clone();
        input.push_fail(Box::new(move |failure| on_fail.reject(failure)));
        input.flush();
    }
    out
}
