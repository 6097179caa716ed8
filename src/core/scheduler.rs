// src/core/scheduler.rs

use futures::FutureExt;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Identity of a descriptor within one scheduler run: its index in the accepted list.
pub type ProbeId = usize;

/// Terminal state of one probe. Every accepted descriptor gets exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<R> {
    Completed(R),
    Failed { reason: String },
}

impl<R> ProbeOutcome<R> {
    pub fn completed(&self) -> Option<&R> {
        match self {
            ProbeOutcome::Completed(r) => Some(r),
            ProbeOutcome::Failed { .. } => None,
        }
    }
}

/// Set when the caller asked for more probes than the ceiling allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub requested: usize,
    pub accepted: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("probe ceiling must be at least 1")]
    ZeroCeiling,
}

/// Everything a run produced. `outcomes` is keyed by [`ProbeId`] and has one entry per
/// element of `descriptors`; its iteration order carries no meaning.
#[derive(Debug)]
pub struct ScheduleReport<D, R> {
    pub descriptors: Vec<D>,
    pub outcomes: HashMap<ProbeId, ProbeOutcome<R>>,
    pub truncation: Option<Truncation>,
}

impl<D, R> ScheduleReport<D, R> {
    /// Descriptor/outcome pairs in input order.
    pub fn pairs(&self) -> impl Iterator<Item = (&D, &ProbeOutcome<R>)> {
        self.descriptors
            .iter()
            .enumerate()
            .filter_map(|(id, d)| self.outcomes.get(&id).map(|o| (d, o)))
    }

    pub fn requested(&self) -> usize {
        self.truncation.map_or(self.descriptors.len(), |t| t.requested)
    }

    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }
}

/// Runs probes on a fixed pool of workers that pull from one shared queue.
#[derive(Debug, Clone, Copy)]
pub struct ProbeScheduler {
    workers: usize,
    max_probes: usize,
}

impl ProbeScheduler {
    pub fn new(workers: usize, max_probes: usize) -> Result<Self, SchedulerError> {
        if workers == 0 {
            return Err(SchedulerError::ZeroWorkers);
        }
        if max_probes == 0 {
            return Err(SchedulerError::ZeroCeiling);
        }
        Ok(Self { workers, max_probes })
    }

    /// Executes every accepted descriptor with `executor`.
    ///
    /// At most `workers` probes are in flight at once. An `Err` or a panic from one probe
    /// becomes `ProbeOutcome::Failed` for that descriptor only.
    pub async fn run<D, R, E, F, Fut>(&self, descriptors: Vec<D>, executor: F) -> ScheduleReport<D, R>
    where
        D: Clone + Send + 'static,
        R: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let requested = descriptors.len();
        let mut descriptors = descriptors;
        let truncation = if requested > self.max_probes {
            descriptors.truncate(self.max_probes);
            warn!(
                requested,
                accepted = self.max_probes,
                "Probe list exceeds ceiling, truncating."
            );
            Some(Truncation {
                requested,
                accepted: self.max_probes,
            })
        } else {
            None
        };

        let total = descriptors.len();
        let queue: Arc<Mutex<VecDeque<(ProbeId, D)>>> = Arc::new(Mutex::new(
            descriptors.iter().cloned().enumerate().collect(),
        ));
        let results: Arc<Mutex<HashMap<ProbeId, ProbeOutcome<R>>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(total)));
        let executor = Arc::new(executor);

        let pool_size = self.workers.min(total);
        debug!(probes = total, workers = pool_size, "Scheduler run starting.");

        let mut pool = JoinSet::new();
        for _ in 0..pool_size {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let executor = Arc::clone(&executor);
            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((id, descriptor)) = next else { break };

                    let outcome = match AssertUnwindSafe((*executor)(descriptor))
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(result)) => ProbeOutcome::Completed(result),
                        Ok(Err(e)) => ProbeOutcome::Failed { reason: e.to_string() },
                        Err(panic) => ProbeOutcome::Failed {
                            reason: panic_message(panic.as_ref()),
                        },
                    };
                    results.lock().await.insert(id, outcome);
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Scheduler worker terminated abnormally.");
            }
        }

        let mut outcomes = std::mem::take(&mut *results.lock().await);
        // A worker that died mid-probe leaves a hole; nothing is ever silently dropped.
        for id in 0..total {
            outcomes.entry(id).or_insert_with(|| ProbeOutcome::Failed {
                reason: "probe did not complete".to_string(),
            });
        }

        debug!(probes = total, "Scheduler run finished.");
        ScheduleReport {
            descriptors,
            outcomes,
            truncation,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("probe panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("probe panicked: {}", s)
    } else {
        "probe panicked".to_string()
    }
}
