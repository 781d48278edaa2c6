//! Polling recovery path.
//!
//! One sweep runs a fixed number of rounds. Each round fetches the oldest
//! queued jobs and processes them concurrently, joining before the next
//! round starts. The admission gate is not consulted; the shared claim CAS
//! still guarantees a job is processed at most once.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::dispatch::claim;
use super::processor::{JobProcessor, ProcessOutcome};
use super::store::{DocumentStore, StoreError};
use super::types::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    pub rounds: usize,
    pub round_interval: Duration,
    pub batch_size: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            rounds: 12,
            round_interval: Duration::from_secs(5),
            batch_size: 10,
        }
    }
}

/// Totals for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rounds: usize,
    pub fetched: usize,
    /// Claimed by another caller between fetch and claim.
    pub lost: usize,
    pub done: usize,
    pub failed: usize,
    /// Rounds whose fetch failed; the sweep moved on to the next round.
    pub fetch_errors: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: Option<ProcessOutcome>) {
        match outcome {
            Some(ProcessOutcome::Done { .. }) => self.done += 1,
            Some(ProcessOutcome::Failed(_)) => self.failed += 1,
            Some(ProcessOutcome::Skipped) | None => self.lost += 1,
        }
    }
}

#[derive(Debug)]
pub struct PollingSweeper<S> {
    store: Arc<S>,
    processor: Arc<JobProcessor<S>>,
    settings: SweepSettings,
}

impl<S: DocumentStore> PollingSweeper<S> {
    pub fn new(store: Arc<S>, processor: Arc<JobProcessor<S>>, settings: SweepSettings) -> Self {
        Self {
            store,
            processor,
            settings,
        }
    }

    pub fn settings(&self) -> SweepSettings {
        self.settings
    }

    /// Run every round of one sweep.
    ///
    /// A failed fetch skips only its own round. The sweep returns an error
    /// only when every round failed to fetch.
    pub async fn run_once(&self) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let mut last_error = None;

        for round in 0..self.settings.rounds {
            if round > 0 {
                tokio::time::sleep(self.settings.round_interval).await;
            }
            report.rounds += 1;

            let batch = match self
                .store
                .query_jobs(JobStatus::Queued, self.settings.batch_size)
                .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(round, error = %err, "sweep fetch failed; skipping round");
                    report.fetch_errors += 1;
                    last_error = Some(err);
                    continue;
                }
            };
            if batch.is_empty() {
                debug!(round, "sweep round found no queued jobs");
                continue;
            }
            report.fetched += batch.len();

            let mut tasks = JoinSet::new();
            for job in batch {
                let store = self.store.clone();
                let processor = self.processor.clone();
                tasks.spawn(async move {
                    match claim(&*store, job.id).await {
                        Ok(Some(claimed)) => Some(processor.process(&claimed).await),
                        Ok(None) => None,
                        Err(err) => {
                            warn!(job_id = %job.id, error = %err, "sweep claim failed");
                            None
                        }
                    }
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => report.record(outcome),
                    Err(err) => warn!(error = %err, "sweep task panicked"),
                }
            }
        }

        if report.fetch_errors == report.rounds {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                done = report.done,
                failed = report.failed,
                lost = report.lost,
                fetch_errors = report.fetch_errors,
                "polling sweep finished"
            );
        }
        Ok(report)
    }
}
