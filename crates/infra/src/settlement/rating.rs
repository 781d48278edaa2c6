//! Idempotent rating settlement.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use arena_core::{EloAudit, RatingChange};

use super::SettlementError;
use crate::jobs::{BattleJob, Cas, DocumentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingOutcome {
    /// The job is not finished yet.
    NotReady,
    /// Another execution already settled this job.
    AlreadyApplied,
    Applied(EloAudit),
    /// Logged and dropped; the job keeps `eloApplied=false`.
    Failed(String),
}

/// Applies rating changes once per finished job.
///
/// The job, both participants and the `eloApplied` flag are read and written
/// in one transaction, so two concurrent executions can never both commit.
#[derive(Debug)]
pub struct RatingSettlement<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> RatingSettlement<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// React to an update of `job` (the post-update snapshot).
    pub async fn on_job_updated(&self, job: &BattleJob) -> RatingOutcome {
        if !job.finished {
            return RatingOutcome::NotReady;
        }
        if job.elo_applied {
            return RatingOutcome::AlreadyApplied;
        }

        match self.settle(job).await {
            Ok(Cas::Committed(audit)) => {
                info!(
                    job_id = %job.id,
                    winner_delta = audit.winner_delta,
                    loser_delta = audit.loser_delta,
                    "ratings settled"
                );
                RatingOutcome::Applied(audit)
            }
            Ok(Cas::Aborted(reason)) => {
                debug!(job_id = %job.id, reason = %reason, "rating settlement skipped");
                RatingOutcome::AlreadyApplied
            }
            Err(err) => {
                warn!(job_id = %job.id, code = err.code(), error = %err, "rating settlement failed");
                RatingOutcome::Failed(err.to_string())
            }
        }
    }

    async fn settle(&self, job: &BattleJob) -> Result<Cas<EloAudit>, SettlementError> {
        let job_id = job.id;
        let cas = self
            .store
            .transaction(move |tx| {
                let mut job = tx.job(job_id).ok_or(StoreError::JobNotFound(job_id))?;
                if job.elo_applied {
                    return Ok(Cas::abort("ratings already applied"));
                }
                if !job.finished {
                    return Ok(Cas::abort("job is not finished"));
                }
                let (Some(winner_id), Some(loser_id)) = (job.winner_id, job.loser_id) else {
                    return Err(StoreError::Storage(format!(
                        "finished job {job_id} has no winner/loser"
                    )));
                };
                let mut winner = tx
                    .participant(winner_id)
                    .ok_or(StoreError::ParticipantNotFound(winner_id))?;
                let mut loser = tx
                    .participant(loser_id)
                    .ok_or(StoreError::ParticipantNotFound(loser_id))?;

                let winner_before = winner.rating_or_default();
                let loser_before = loser.rating_or_default();
                let audit = RatingChange::compute(winner_before, loser_before)
                    .audit(winner_before, loser_before)?;

                let now = Utc::now();
                winner.record_battle(audit.winner_after, now);
                loser.record_battle(audit.loser_after, now);
                job.apply_elo(audit, now)?;

                tx.put_participant(winner);
                tx.put_participant(loser);
                tx.put_job(job);
                Ok(Cas::Committed(audit))
            })
            .await?;
        Ok(cas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{InMemoryDocumentStore, claim};
    use crate::test_support::{FirstWins, processor, queue_job, seed_pair};

    async fn finished_job(
        store: &Arc<InMemoryDocumentStore>,
        rating_a: i64,
        rating_b: i64,
    ) -> BattleJob {
        let (a, b) = seed_pair(store, rating_a, rating_b).await;
        let job = queue_job(store, &a, &b, false).await;
        let claimed = claim(&**store, job.id).await.unwrap().unwrap();
        processor(store, Arc::new(FirstWins::default()))
            .process(&claimed)
            .await;
        store.get_job(job.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn applies_once_and_records_audit() {
        let store = InMemoryDocumentStore::arc();
        let job = finished_job(&store, 1200, 1000).await;
        let settlement = RatingSettlement::new(store.clone());

        let RatingOutcome::Applied(audit) = settlement.on_job_updated(&job).await else {
            panic!("expected settlement to apply");
        };
        assert_eq!(audit.winner_before, 1200);
        assert!(audit.winner_after > 1200);
        assert!(audit.loser_after < 1000);

        // Replaying the stale snapshot aborts inside the transaction.
        assert_eq!(
            settlement.on_job_updated(&job).await,
            RatingOutcome::AlreadyApplied
        );

        let stored = store.get_job(job.id).await.unwrap().unwrap();
        assert!(stored.elo_applied);
        assert_eq!(stored.elo, Some(audit));
        let winner = store
            .get_participant(job.participant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.rating, Some(audit.winner_after));
        assert_eq!(winner.battle_count, 1);
    }

    #[tokio::test]
    async fn unfinished_job_is_not_ready() {
        let store = InMemoryDocumentStore::arc();
        let (a, b) = seed_pair(&store, 1000, 1000).await;
        let job = queue_job(&store, &a, &b, false).await;

        let outcome = RatingSettlement::new(store).on_job_updated(&job).await;
        assert_eq!(outcome, RatingOutcome::NotReady);
    }

    #[tokio::test]
    async fn missing_participant_fails_without_partial_writes() {
        let store = InMemoryDocumentStore::arc();
        let job = finished_job(&store, 1000, 1000).await;

        // Point the loser at a participant that does not exist.
        let id = job.id;
        store
            .transaction(move |tx| {
                let mut job = tx.job(id).unwrap();
                job.loser_id = Some(arena_core::ParticipantId::new());
                tx.put_job(job);
                Ok(Cas::Committed(()))
            })
            .await
            .unwrap();
        let job = store.get_job(id).await.unwrap().unwrap();

        let outcome = RatingSettlement::new(store.clone()).on_job_updated(&job).await;
        assert!(matches!(outcome, RatingOutcome::Failed(_)));

        let winner = store
            .get_participant(job.participant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.rating, Some(1000));
        assert_eq!(winner.battle_count, 0);
        assert!(!store.get_job(id).await.unwrap().unwrap().elo_applied);
    }

    #[tokio::test]
    async fn extreme_rating_fails_cleanly_and_store_stays_usable() {
        let store = InMemoryDocumentStore::arc();
        let job = finished_job(&store, i64::MAX, 0).await;

        let outcome = RatingSettlement::new(store.clone()).on_job_updated(&job).await;
        assert!(matches!(outcome, RatingOutcome::Failed(_)));

        // The store lock must not be poisoned: reads and new work still succeed.
        let stored = store.get_job(job.id).await.unwrap().unwrap();
        assert!(!stored.elo_applied);
        let winner = store
            .get_participant(job.participant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.rating, Some(i64::MAX));
        assert_eq!(winner.battle_count, 0);

        let next = finished_job(&store, 1000, 1000).await;
        assert!(matches!(
            RatingSettlement::new(store.clone()).on_job_updated(&next).await,
            RatingOutcome::Applied(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_settlements_commit_once() {
        let store = InMemoryDocumentStore::arc();
        let job = finished_job(&store, 1000, 1000).await;
        let settlement = Arc::new(RatingSettlement::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let settlement = settlement.clone();
            let job = job.clone();
            handles.push(tokio::spawn(async move { settlement.on_job_updated(&job).await }));
        }
        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), RatingOutcome::Applied(_)) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let winner = store
            .get_participant(job.participant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.battle_count, 1);
    }
}
