//! End-to-end chaining scenarios driven on the deterministic lab scheduler.
//!
//! These tests exercise the operator contracts across whole chains:
//! short-circuit rejection, recovery, flattening, and the one-tick
//! delivery guarantee.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use deferral::{Failure, LabScheduler, Promises};

fn lab() -> (Promises, Arc<LabScheduler>) {
    let scheduler = Arc::new(LabScheduler::new());
    (Promises::new(Arc::clone(&scheduler) as _), scheduler)
}

#[test]
fn multi_stage_then_chain() {
    let (promises, lab) = lab();
    let out = promises
        .resolved(1)
        .then(|v| v + 1)
        .then(|v| v * 10)
        .then(|v| format!("result={v}"));
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some("result=20".to_string()));
}

#[test]
fn each_stage_costs_at_least_one_tick() {
    let (promises, lab) = lab();
    let out = promises.resolved(0).then(|v| v + 1).then(|v| v + 1);

    // resolved() has flushed nothing yet; two stages need two waves of
    // scheduler work before the tail settles.
    assert!(!out.is_settled());
    lab.step();
    assert!(!out.is_settled());
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some(2));
}

#[test]
fn rejection_short_circuits_to_the_terminal_fail() {
    let (promises, lab) = lab();
    let stages_run = Arc::new(AtomicUsize::new(0));
    let s1 = Arc::clone(&stages_run);
    let s2 = Arc::clone(&stages_run);

    let out = promises
        .rejected::<i32>(Failure::new("source failed").with_kind("io"))
        .then(move |v| {
            s1.fetch_add(1, Ordering::SeqCst);
            v
        })
        .then(move |v| {
            s2.fetch_add(1, Ordering::SeqCst);
            v
        })
        .fail(|failure| {
            assert!(failure.is("io"));
            failure.message().to_string()
        });

    lab.run_until_quiescent();
    assert_eq!(stages_run.load(Ordering::SeqCst), 0);
    assert_eq!(out.value(), Some("source failed".to_string()));
}

#[test]
fn fail_recovery_feeds_the_rest_of_the_chain() {
    let (promises, lab) = lab();
    let out = promises
        .rejected::<i32>(Failure::new("transient"))
        .fail(|_| 42)
        .then(|v| v);
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some(42));
}

#[test]
fn fail_handler_panic_rejects_downstream() {
    let (promises, lab) = lab();
    let out = promises
        .rejected::<i32>(Failure::new("first"))
        .fail(|_| -> i32 { panic!("recovery also broke") })
        .fail(|failure| failure.message().to_string());
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some("recovery also broke".to_string()));
}

#[test]
fn pipe_chains_sequential_async_work() {
    let (promises, lab) = lab();
    let farm = promises.clone();
    let out = promises
        .resolved(3)
        .pipe(move |v| farm.resolved(v * 2))
        .then(|v| v + 1);
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some(7));
}

#[test]
fn pipe_inner_rejection_reaches_the_outer_fail() {
    let (promises, lab) = lab();
    let farm = promises.clone();
    let out = promises
        .resolved(3)
        .pipe(move |_| farm.rejected::<i32>(Failure::new("inner broke")))
        .fail(|failure| failure.message().to_string());
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some("inner broke".to_string()));
}

#[test]
fn pipe_transform_panic_rejects() {
    let (promises, lab) = lab();
    let out = promises
        .resolved(3)
        .pipe(|_| -> deferral::Promise<i32> { panic!("pipe transform broke") })
        .fail(|failure| failure.message().to_string());
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some("pipe transform broke".to_string()));
}

#[test]
fn always_observes_cleanup_on_failure_paths() {
    let (promises, lab) = lab();
    let cleanups = Arc::new(AtomicUsize::new(0));
    let on_fail = Arc::clone(&cleanups);

    let source = promises.rejected::<i32>(Failure::new("down"));
    let _same = source.always(move || {
        on_fail.fetch_add(1, Ordering::SeqCst);
    });
    let _tail = source.fail(|_| 0);
    lab.run_until_quiescent();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[test]
fn producer_settles_from_create_executor_later() {
    let (promises, lab) = lab();
    let stash = Arc::new(Mutex::new(None));
    let keep = Arc::clone(&stash);
    let out = promises.create::<i32, _>(move |resolve, _reject| {
        // Producer defers settlement past registration.
        *keep.lock() = Some(resolve);
    });
    let doubled = out.then(|v| v * 2);
    lab.run_until_quiescent();
    assert!(!doubled.is_settled());

    if let Some(resolve) = stash.lock().take() {
        resolve(21);
    }
    lab.run_until_quiescent();
    assert_eq!(doubled.value(), Some(42));
}

#[test]
fn late_listener_on_settled_promise_gets_one_tick_delivery() {
    let (promises, lab) = lab();
    let source = promises.resolved(5);
    lab.run_until_quiescent();

    let out = source.then(|v| v + 1);
    assert!(!out.is_settled());
    lab.run_until_quiescent();
    assert_eq!(out.value(), Some(6));
}
