//! Event-driven dispatch and the shared claim CAS.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use arena_core::JobId;

use super::admission::AdmissionGate;
use super::processor::{JobProcessor, ProcessOutcome};
use super::store::{Cas, DocumentStore, StoreError};
use super::types::{BattleJob, JobStatus};

/// Move a job `queued → processing` iff it is still queued.
///
/// Returns the claimed snapshot, or `None` when another caller got there
/// first (or the job vanished). Both dispatch paths claim through here.
pub async fn claim<S: DocumentStore>(
    store: &S,
    job_id: JobId,
) -> Result<Option<BattleJob>, StoreError> {
    let outcome = store
        .transaction(move |tx| {
            let Some(mut job) = tx.job(job_id) else {
                return Ok(Cas::abort("job no longer exists"));
            };
            if job.status != JobStatus::Queued {
                return Ok(Cas::abort(format!("job is already {}", job.status)));
            }
            job.mark_processing(Utc::now())?;
            tx.put_job(job.clone());
            Ok(Cas::Committed(job))
        })
        .await?;

    match outcome {
        Cas::Committed(job) => Ok(Some(job)),
        Cas::Aborted(reason) => {
            trace!(job_id = %job_id, reason = %reason, "claim lost");
            Ok(None)
        }
    }
}

/// What one trigger invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The job was not `queued` when the trigger looked (replayed event).
    NotQueued,
    /// Admission refused; the job stays queued for the sweeper.
    Deferred,
    /// Another caller claimed the job first.
    LostRace,
    /// A store failure before the claim; the job stays queued.
    Dropped(String),
    /// The job was claimed and processed, followed by `chained` more jobs.
    Processed {
        outcome: ProcessOutcome,
        chained: usize,
    },
}

/// Entry point invoked once per job-creation event.
#[derive(Debug)]
pub struct DispatchTrigger<S> {
    store: Arc<S>,
    gate: AdmissionGate<S>,
    processor: Arc<JobProcessor<S>>,
}

impl<S: DocumentStore> DispatchTrigger<S> {
    pub fn new(store: Arc<S>, gate: AdmissionGate<S>, processor: Arc<JobProcessor<S>>) -> Self {
        Self {
            store,
            gate,
            processor,
        }
    }

    /// Admit and process `job_id`, then keep admitting the oldest queued job
    /// while capacity allows.
    ///
    /// Chaining is a loop rather than re-entry, so a long queue never grows
    /// the stack. It stops at the first job that is deferred, lost or absent.
    pub async fn on_job_created(&self, job_id: JobId) -> DispatchOutcome {
        let outcome = match self.admit(job_id).await {
            Admission::Processed(outcome) => outcome,
            Admission::Skipped(skipped) => return skipped,
        };

        let mut chained = 0;
        loop {
            let next = match self.store.query_jobs(JobStatus::Queued, 1).await {
                Ok(mut jobs) => jobs.pop(),
                Err(err) => {
                    warn!(error = %err, "failed to look up next queued job");
                    None
                }
            };
            let Some(next) = next else {
                break;
            };
            match self.admit(next.id).await {
                Admission::Processed(_) => chained += 1,
                Admission::Skipped(_) => break,
            }
        }

        if chained > 0 {
            info!(job_id = %job_id, chained, "chained dispatch drained queued jobs");
        }
        DispatchOutcome::Processed { outcome, chained }
    }

    async fn admit(&self, job_id: JobId) -> Admission {
        match self.store.get_job(job_id).await {
            Ok(Some(job)) if job.status == JobStatus::Queued => {}
            Ok(_) => {
                debug!(job_id = %job_id, "trigger ignored: job not queued");
                return Admission::Skipped(DispatchOutcome::NotQueued);
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "trigger failed before claim");
                return Admission::Skipped(DispatchOutcome::Dropped(err.to_string()));
            }
        }

        match self.gate.can_admit().await {
            Ok(true) => {}
            Ok(false) => {
                debug!(job_id = %job_id, "admission deferred; leaving job queued");
                return Admission::Skipped(DispatchOutcome::Deferred);
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "admission check failed");
                return Admission::Skipped(DispatchOutcome::Dropped(err.to_string()));
            }
        }

        let claimed = match claim(&*self.store, job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return Admission::Skipped(DispatchOutcome::LostRace),
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "claim failed");
                return Admission::Skipped(DispatchOutcome::Dropped(err.to_string()));
            }
        };

        Admission::Processed(self.processor.process(&claimed).await)
    }
}

enum Admission {
    Processed(ProcessOutcome),
    Skipped(DispatchOutcome),
}
