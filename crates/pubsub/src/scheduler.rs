//! # Deferred Execution
//!
//! The dispatcher never sleeps or spawns on its own. Deferred delivery
//! (`trigger_async`) and once-timeouts are handed to a [`Scheduler`].
//!
//! Two implementations are provided:
//!
//! - [`TokioScheduler`]: a FIFO worker task on the caller's current-thread
//!   tokio runtime.
//! - [`ManualScheduler`]: a virtual-clock queue driven explicitly by the host.

use crate::error::DispatchError;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::runtime::{self, RuntimeFlavor};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs closures after the current synchronous work completes.
///
/// Implementations must run tasks scheduled with equal delay in the order
/// they were scheduled.
pub trait Scheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed and the caller's stack has unwound.
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError>;
}

fn run_task(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        warn!("Deferred task panicked");
    }
}

// =============================================================================
// TOKIO
// =============================================================================

struct Worker {
    tx: mpsc::UnboundedSender<Task>,
    runtime: runtime::Handle,
}

thread_local! {
    /// One worker per thread, living on that thread's current-thread runtime.
    static WORKER: RefCell<Option<Worker>> = const { RefCell::new(None) };
}

/// Scheduler backed by a tokio worker task on the caller's thread.
///
/// Deferred tasks must not run beside the code that scheduled them, so only
/// a current-thread runtime is accepted: its worker is polled on the same
/// thread, once the caller yields back to the runtime. Each thread gets its
/// own FIFO worker, spawned lazily and respawned if the previous runtime
/// has shut down.
///
/// [`schedule`](Scheduler::schedule) fails with
/// [`DispatchError::SchedulerUnavailable`] outside a runtime and on a
/// multi-thread runtime. Hosts built on `#[tokio::main]` should either use
/// `flavor = "current_thread"` or drive a [`ManualScheduler`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn worker() -> Result<(mpsc::UnboundedSender<Task>, runtime::Handle), DispatchError> {
        let runtime = runtime::Handle::try_current()
            .map_err(|e| DispatchError::SchedulerUnavailable(e.to_string()))?;
        if runtime.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(DispatchError::SchedulerUnavailable(
                "deferred tasks need a current-thread runtime".into(),
            ));
        }

        WORKER.with(|cell| {
            let mut worker = cell.borrow_mut();
            if let Some(w) = worker.as_ref().filter(|w| !w.tx.is_closed()) {
                return Ok((w.tx.clone(), w.runtime.clone()));
            }

            let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
            runtime.spawn(async move {
                while let Some(task) = rx.recv().await {
                    run_task(task);
                }
            });
            debug!("Deferred task worker started");

            *worker = Some(Worker {
                tx: tx.clone(),
                runtime: runtime.clone(),
            });
            Ok((tx, runtime))
        })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        let (tx, runtime) = Self::worker()?;

        if delay.is_zero() {
            return tx
                .send(task)
                .map_err(|_| DispatchError::SchedulerUnavailable("worker stopped".into()));
        }

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(task).is_err() {
                debug!("Delayed task dropped (worker stopped)");
            }
        });
        Ok(())
    }
}

// =============================================================================
// MANUAL
// =============================================================================

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), Task>,
}

/// Deterministic scheduler with a virtual clock.
///
/// Nothing runs until the host calls [`run_until_idle`](Self::run_until_idle)
/// or [`advance`](Self::advance).
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting, due or not.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Run every task that is due, including tasks those tasks schedule
    /// without delay. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let now = self.now();
        self.run_due(now)
    }

    /// Move the clock forward by `by`, running tasks in due order as the
    /// clock passes them. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let ran = self.run_due(target);
        let mut state = self.state.lock();
        if state.now < target {
            state.now = target;
        }
        ran
    }

    fn run_due(&self, until: Duration) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state.lock();
                let Some(entry) = state.queue.first_entry() else {
                    break;
                };
                if entry.key().0 > until {
                    break;
                }
                let ((due, _), task) = entry.remove_entry();
                if due > state.now {
                    state.now = due;
                }
                task
            };
            run_task(task);
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.queue.insert((due, seq), task);
        Ok(())
    }
}
