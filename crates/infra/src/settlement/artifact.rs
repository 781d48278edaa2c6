//! Two-phase artifact generation.
//!
//! Phase A takes the lock (`artifactStatus: absent → creating`) in a
//! transaction. Phase B runs outside any transaction: it loads both
//! participants, calls the naming service and validates the labels. The
//! result is committed as `done` or `error`; either way the lock is released
//! because the status is no longer `creating`.
//!
//! An `error` result is final for automatic processing. Only the operator
//! hooks move a job back to `absent`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use arena_ai::{ArtifactLabels, LabelPolicy, NamingError, NamingRequest, NamingService};
use arena_core::JobId;

use super::SettlementError;
use crate::jobs::{ArtifactStatus, BattleJob, Cas, DocumentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Not finished, not eligible, or already handled.
    Ineligible,
    /// Another execution owns (or owned) the lock.
    LockLost,
    Generated(ArtifactLabels),
    /// Recorded as `artifactStatus=error`.
    Failed { code: String, message: String },
}

pub struct ArtifactGenerationLock<S> {
    store: Arc<S>,
    naming: Arc<dyn NamingService>,
    policy: LabelPolicy,
    naming_timeout: Option<Duration>,
}

impl<S> core::fmt::Debug for ArtifactGenerationLock<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArtifactGenerationLock")
            .field("policy", &self.policy)
            .field("naming_timeout", &self.naming_timeout)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> ArtifactGenerationLock<S> {
    pub fn new(store: Arc<S>, naming: Arc<dyn NamingService>, policy: LabelPolicy) -> Self {
        Self {
            store,
            naming,
            policy,
            naming_timeout: None,
        }
    }

    /// Bound each naming call; an expired call fails as `naming_timeout`.
    pub fn with_naming_timeout(mut self, timeout: Duration) -> Self {
        self.naming_timeout = Some(timeout);
        self
    }

    /// React to an update of `job` (the post-update snapshot).
    pub async fn on_job_updated(&self, job: &BattleJob) -> ArtifactOutcome {
        if !job.artifact_lock_available() {
            return ArtifactOutcome::Ineligible;
        }

        let locked = match self.acquire(job.id).await {
            Ok(Cas::Committed(locked)) => locked,
            Ok(Cas::Aborted(reason)) => {
                debug!(job_id = %job.id, reason = %reason, "artifact lock not acquired");
                return ArtifactOutcome::LockLost;
            }
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "artifact lock acquisition failed");
                return ArtifactOutcome::LockLost;
            }
        };

        match self.generate(&locked).await {
            Ok(labels) => self.commit_done(&locked, labels).await,
            Err(err) => self.commit_error(&locked, &err).await,
        }
    }

    /// Phase A.
    async fn acquire(&self, job_id: JobId) -> Result<Cas<BattleJob>, StoreError> {
        self.store
            .transaction(move |tx| {
                let Some(mut job) = tx.job(job_id) else {
                    return Ok(Cas::abort("job no longer exists"));
                };
                if !job.artifact_lock_available() {
                    return Ok(Cas::abort("artifact lock unavailable"));
                }
                job.acquire_artifact_lock(Utc::now())?;
                tx.put_job(job.clone());
                Ok(Cas::Committed(job))
            })
            .await
    }

    /// Phase B.
    async fn generate(&self, job: &BattleJob) -> Result<ArtifactLabels, SettlementError> {
        let (Some(winner_id), Some(loser_id)) = (job.winner_id, job.loser_id) else {
            return Err(SettlementError::Unresolved(job.id));
        };
        let winner = self
            .store
            .get_participant(winner_id)
            .await?
            .ok_or(SettlementError::ParticipantNotFound(winner_id))?;
        let loser = self
            .store
            .get_participant(loser_id)
            .await?
            .ok_or(SettlementError::ParticipantNotFound(loser_id))?;

        let request = NamingRequest::for_battle(
            &winner,
            &loser,
            job.narrative_summary.clone().unwrap_or_default(),
        );
        let pair = match self.naming_timeout {
            Some(limit) => tokio::time::timeout(limit, self.naming.name_pair(&request))
                .await
                .map_err(|_| NamingError::Timeout)??,
            None => self.naming.name_pair(&request).await?,
        };

        Ok(self.policy.validate(&pair, &request)?)
    }

    async fn commit_done(&self, locked: &BattleJob, labels: ArtifactLabels) -> ArtifactOutcome {
        let job_id = locked.id;
        let lock_stamp = locked.artifact_requested_at;
        let written = labels.clone();
        let result = self
            .store
            .transaction(move |tx| {
                let Some(mut job) = tx.job(job_id) else {
                    return Ok(Cas::abort("job no longer exists"));
                };
                if !holds_lock(&job, lock_stamp) {
                    return Ok(Cas::abort("artifact lock was released"));
                }
                job.complete_artifact(written, Utc::now())?;
                tx.put_job(job);
                Ok(Cas::Committed(()))
            })
            .await;

        match result {
            Ok(Cas::Committed(())) => {
                info!(job_id = %job_id, winner = %labels.winner, loser = %labels.loser, "artifact generated");
                ArtifactOutcome::Generated(labels)
            }
            Ok(Cas::Aborted(reason)) => {
                warn!(job_id = %job_id, reason = %reason, "generated artifact discarded");
                ArtifactOutcome::LockLost
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to commit artifact");
                ArtifactOutcome::Failed {
                    code: "store_error".to_string(),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn commit_error(&self, locked: &BattleJob, err: &SettlementError) -> ArtifactOutcome {
        let job_id = locked.id;
        let lock_stamp = locked.artifact_requested_at;
        let code = err.code().to_string();
        let message = format!("{code}: {err}");
        warn!(job_id = %job_id, code = %code, error = %err, "artifact generation failed");

        let recorded = message.clone();
        let result = self
            .store
            .transaction(move |tx| {
                let Some(mut job) = tx.job(job_id) else {
                    return Ok(Cas::abort("job no longer exists"));
                };
                if !holds_lock(&job, lock_stamp) {
                    return Ok(Cas::abort("artifact lock was released"));
                }
                job.fail_artifact(recorded)?;
                tx.put_job(job);
                Ok(Cas::Committed(()))
            })
            .await;

        match result {
            Ok(Cas::Committed(())) => {}
            Ok(Cas::Aborted(reason)) => {
                debug!(job_id = %job_id, reason = %reason, "artifact failure not recorded");
            }
            Err(store_err) => {
                warn!(job_id = %job_id, error = %store_err, "could not record artifact failure");
            }
        }
        ArtifactOutcome::Failed { code, message }
    }

    /// Operator action: `error → absent`, clearing `artifactError`.
    ///
    /// The resulting update event makes the lock re-evaluate the job.
    pub async fn retry_artifact(&self, job_id: JobId) -> Result<BattleJob, SettlementError> {
        let job = self.reset(job_id, ArtifactStatus::Error).await?;
        info!(job_id = %job_id, "artifact retry requested by operator");
        Ok(job)
    }

    /// Operator action: `creating → absent` for a lock whose owner died.
    ///
    /// If the original owner is in fact still running, its commit is
    /// discarded because the lock it holds no longer matches.
    pub async fn release_stuck_lock(&self, job_id: JobId) -> Result<BattleJob, SettlementError> {
        let job = self.reset(job_id, ArtifactStatus::Creating).await?;
        info!(job_id = %job_id, "stuck artifact lock released by operator");
        Ok(job)
    }

    async fn reset(
        &self,
        job_id: JobId,
        expected: ArtifactStatus,
    ) -> Result<BattleJob, SettlementError> {
        let cas = self
            .store
            .transaction(move |tx| {
                let mut job = tx.job(job_id).ok_or(StoreError::JobNotFound(job_id))?;
                job.reset_artifact(expected)?;
                tx.put_job(job.clone());
                Ok(Cas::Committed(job))
            })
            .await?;
        cas.committed().ok_or(SettlementError::JobNotFound(job_id))
    }
}

/// The job is still `creating` under the lock taken at `lock_stamp`.
fn holds_lock(job: &BattleJob, lock_stamp: Option<chrono::DateTime<Utc>>) -> bool {
    job.artifact_status == Some(ArtifactStatus::Creating) && job.artifact_requested_at == lock_stamp
}
