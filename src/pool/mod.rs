//! Bounded pool of suite processes
//!
//! Every suite becomes a task; a semaphore with one permit per worker keeps
//! at most that many child processes alive. A task moves from pending to
//! running once it holds a permit, or straight to skipped if the run was
//! cancelled first. Cancellation never kills a child that already started.

pub mod heartbeat;
pub mod interrupt;
mod worker;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::suite::Suite;
pub use heartbeat::HeartbeatSchedule;
pub use interrupt::InterruptGuard;
pub use worker::WorkerContext;

/// Terminal state of one suite task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Cancelled before its process was started
    Skipped,
    /// Process ran and exited; `code` is `None` when killed by a signal
    Completed { pid: u32, code: Option<i32> },
    /// Process could not be started or waited on
    Errored(String),
}

/// Outcome of one suite
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub suite: Suite,
    pub state: TaskState,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.state, TaskState::Completed { code: Some(0), .. })
    }

    pub fn failed(&self) -> bool {
        !self.passed() && !self.skipped()
    }

    pub fn skipped(&self) -> bool {
        self.state == TaskState::Skipped
    }
}

/// Outcomes of a whole pool run, in suite order
#[derive(Debug, Clone)]
pub struct PoolReport {
    pub outcomes: Vec<SuiteOutcome>,
    pub interrupted: bool,
}

/// Fixed-size pool running one engine process per suite
pub struct WorkerPool {
    workers: usize,
    context: Arc<WorkerContext>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(workers: usize, context: WorkerContext) -> Self {
        Self {
            workers: workers.max(1),
            context: Arc::new(context),
            cancel: CancellationToken::new(),
        }
    }

    /// Token shared with every task; cancelling it stops new suites from starting
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run all suites, stopping new starts once `interrupt` resolves
    ///
    /// After an interrupt the pool still waits for the suites that are
    /// already running, so their results can be merged.
    pub async fn run_until<F>(&self, suites: &[Suite], interrupt: F) -> PoolReport
    where
        F: Future<Output = ()>,
    {
        info!(
            "Running {} suite(s) on {} worker(s)",
            suites.len(),
            self.workers
        );

        let drain = self.run(suites);
        tokio::pin!(drain);

        tokio::select! {
            outcomes = &mut drain => PoolReport { outcomes, interrupted: false },
            _ = interrupt => {
                self.cancel.cancel();
                warn!("Interrupted: no new suites will start, waiting for running ones");
                PoolReport { outcomes: drain.await, interrupted: true }
            }
        }
    }

    /// Run all suites until done or cancelled through [`Self::cancellation`]
    pub async fn run(&self, suites: &[Suite]) -> Vec<SuiteOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(suites.len());

        for suite in suites {
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            let context = self.context.clone();
            let suite = suite.clone();

            handles.push(tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return TaskState::Skipped;
                };
                if cancel.is_cancelled() {
                    return TaskState::Skipped;
                }
                worker::run_suite(context, suite).await
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(suites)
            .map(|(joined, suite)| SuiteOutcome {
                suite: suite.clone(),
                state: joined.unwrap_or_else(|e| TaskState::Errored(e.to_string())),
            })
            .collect()
    }
}
