//! Executes one claimed battle job.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use arena_core::{BattleOutcome, BattleResolver, ParticipantId, ResolveError};

use super::store::{Cas, DocumentStore, StoreError};
use super::types::{BattleJob, JobStatus};

/// Result of [`JobProcessor::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Outcome committed; the job is `done` and `finished`.
    Done {
        winner_id: ParticipantId,
        loser_id: ParticipantId,
    },
    /// The job ended in `error` with this message.
    Failed(String),
    /// The job was not `processing` when re-checked; nothing was done.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("resolver failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job changed underneath the processor: {0}")]
    Lost(String),
}

/// Calls the battle resolver for a claimed job and writes the terminal state.
///
/// Never retries. A failure ends the job in `error` with `finished` unset.
pub struct JobProcessor<S> {
    store: Arc<S>,
    resolver: Arc<dyn BattleResolver>,
}

impl<S> core::fmt::Debug for JobProcessor<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobProcessor").finish_non_exhaustive()
    }
}

impl<S: DocumentStore> JobProcessor<S> {
    pub fn new(store: Arc<S>, resolver: Arc<dyn BattleResolver>) -> Self {
        Self { store, resolver }
    }

    pub async fn process(&self, job: &BattleJob) -> ProcessOutcome {
        match self.store.get_job(job.id).await {
            Ok(Some(current)) if current.status == JobStatus::Processing => {}
            Ok(_) => {
                warn!(job_id = %job.id, "processor invoked on a job that is not processing");
                return ProcessOutcome::Skipped;
            }
            Err(err) => {
                // Still processing as far as we know; fall through to failure.
                return self.fail(job, &ProcessError::Store(err)).await;
            }
        }

        match self.resolve_and_commit(job).await {
            Ok(outcome) => {
                info!(
                    job_id = %job.id,
                    winner_id = %outcome.winner_id,
                    loser_id = %outcome.loser_id,
                    "battle resolved"
                );
                ProcessOutcome::Done {
                    winner_id: outcome.winner_id,
                    loser_id: outcome.loser_id,
                }
            }
            Err(err) => self.fail(job, &err).await,
        }
    }

    async fn resolve_and_commit(&self, job: &BattleJob) -> Result<BattleOutcome, ProcessError> {
        let outcome = self
            .resolver
            .resolve(job.participant_a, job.participant_b)
            .await?;

        let job_id = job.id;
        let committed = outcome.clone();
        let cas = self
            .store
            .transaction(move |tx| {
                let Some(mut job) = tx.job(job_id) else {
                    return Ok(Cas::abort("job no longer exists"));
                };
                if job.status != JobStatus::Processing {
                    return Ok(Cas::abort(format!("job is {}", job.status)));
                }
                job.mark_done(&committed, Utc::now())?;
                tx.put_job(job);
                Ok(Cas::Committed(()))
            })
            .await?;

        match cas {
            Cas::Committed(()) => Ok(outcome),
            Cas::Aborted(reason) => Err(ProcessError::Lost(reason)),
        }
    }

    async fn fail(&self, job: &BattleJob, err: &ProcessError) -> ProcessOutcome {
        let message = err.to_string();
        warn!(job_id = %job.id, error = %message, "battle job failed");

        let job_id = job.id;
        let recorded = message.clone();
        let result = self
            .store
            .transaction(move |tx| {
                let Some(mut job) = tx.job(job_id) else {
                    return Ok(Cas::abort("job no longer exists"));
                };
                if job.status != JobStatus::Processing {
                    return Ok(Cas::abort(format!("job is {}", job.status)));
                }
                job.mark_failed(recorded)?;
                tx.put_job(job);
                Ok(Cas::Committed(()))
            })
            .await;

        match result {
            Ok(Cas::Committed(())) => ProcessOutcome::Failed(message),
            Ok(Cas::Aborted(reason)) => {
                warn!(job_id = %job_id, reason = %reason, "failure not recorded");
                ProcessOutcome::Failed(message)
            }
            Err(store_err) => {
                error!(job_id = %job_id, error = %store_err, "could not record job failure");
                ProcessOutcome::Failed(message)
            }
        }
    }
}
