//! The scheduler port: "run this callback later, off the current stack".
//!
//! Every continuation dispatch in this crate goes through a [`Schedule`]
//! implementation supplied at subsystem construction time. The contract is
//! deliberately minimal:
//!
//! - `schedule(job)` arranges for `job` to run at some future point
//! - `job` never runs synchronously inside `schedule` itself
//!
//! The port is injected, never a process-wide cell: construct a
//! [`Promises`](crate::Promises) with the handle and every promise it
//! creates carries the capability. Host applications typically adapt their
//! event loop or timer facility; tests use the deterministic
//! [`LabScheduler`] and drive it tick by tick.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// A zero-argument unit of work handed to the scheduler.
pub type Job = Box<dyn FnOnce() + Send>;

/// Capability to run a job later, never on the caller's current stack.
pub trait Schedule: Send + Sync {
    /// Arranges for `job` to run at some future point.
    ///
    /// Implementations must not invoke `job` before returning.
    fn schedule(&self, job: Job);
}

/// Shared handle to the injected scheduler capability.
pub type SchedulerHandle = Arc<dyn Schedule>;

/// Default step cap for [`LabScheduler::run_until_quiescent`].
const MAX_LAB_STEPS: u64 = 100_000;

/// Deterministic FIFO scheduler for tests and examples.
///
/// Scheduled jobs accumulate in a queue and nothing runs until the caller
/// drives the scheduler with [`step`](Self::step) or
/// [`run_until_quiescent`](Self::run_until_quiescent). Jobs scheduled while
/// a job is running land at the back of the queue, so callback chains
/// progress one hop per step, which is exactly the "at least one scheduler
/// tick" guarantee tests need to observe.
#[derive(Default)]
pub struct LabScheduler {
    queue: Mutex<VecDeque<Job>>,
}

impl LabScheduler {
    /// Creates an empty lab scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of jobs currently queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs the oldest queued job, if any. Returns whether one ran.
    pub fn step(&self) -> bool {
        let job = self.queue.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs queued jobs until the queue drains or the step cap is hit.
    ///
    /// Returns the number of jobs executed. The cap guards against
    /// continuation chains that reschedule forever.
    pub fn run_until_quiescent(&self) -> u64 {
        let mut steps = 0;
        while steps < MAX_LAB_STEPS && self.step() {
            steps += 1;
        }
        steps
    }
}

impl Schedule for LabScheduler {
    fn schedule(&self, job: Job) {
        self.queue.lock().push_back(job);
    }
}

impl std::fmt::Debug for LabScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
