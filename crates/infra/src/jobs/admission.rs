//! Admission throttle for the event-driven dispatch path.
//!
//! The gate is a read-then-decide check: the count it reads is not reserved,
//! so concurrent triggers can overshoot the ceiling by at most the number of
//! triggers racing between their read and their claim. The polling sweeper
//! does not consult the gate at all. The ceiling is a soft target.

use std::sync::Arc;

use tracing::debug;

use super::store::{DocumentStore, StoreError};
use super::types::JobStatus;

/// Default number of jobs allowed in `processing` before triggers defer.
pub const DEFAULT_ADMISSION_CEILING: usize = 8;

#[derive(Debug)]
pub struct AdmissionGate<S> {
    store: Arc<S>,
    ceiling: usize,
}

impl<S> Clone for AdmissionGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ceiling: self.ceiling,
        }
    }
}

impl<S: DocumentStore> AdmissionGate<S> {
    pub fn new(store: Arc<S>, ceiling: usize) -> Self {
        Self { store, ceiling }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// True iff fewer than `ceiling` jobs are currently `processing`.
    pub async fn can_admit(&self) -> Result<bool, StoreError> {
        let processing = self
            .store
            .count_jobs_by_status(JobStatus::Processing)
            .await?;
        let admit = processing < self.ceiling;
        debug!(processing, ceiling = self.ceiling, admit, "admission check");
        Ok(admit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::store::InMemoryDocumentStore;
    use crate::jobs::{BattleJob, claim};
    use arena_core::ParticipantId;

    async fn queued(store: &InMemoryDocumentStore, n: usize) -> Vec<BattleJob> {
        let mut jobs = Vec::new();
        for _ in 0..n {
            let job = BattleJob::new(ParticipantId::new(), ParticipantId::new()).unwrap();
            store.insert_job(job.clone()).await.unwrap();
            jobs.push(job);
        }
        jobs
    }

    #[tokio::test]
    async fn admits_below_ceiling_and_refuses_at_it() {
        let store = InMemoryDocumentStore::arc();
        let gate = AdmissionGate::new(store.clone(), 2);
        let jobs = queued(&store, 3).await;

        assert!(gate.can_admit().await.unwrap());
        claim(&*store, jobs[0].id).await.unwrap();
        assert!(gate.can_admit().await.unwrap());
        claim(&*store, jobs[1].id).await.unwrap();
        assert!(!gate.can_admit().await.unwrap());
    }

    #[tokio::test]
    async fn queued_jobs_do_not_count() {
        let store = InMemoryDocumentStore::arc();
        let gate = AdmissionGate::new(store.clone(), 1);
        queued(&store, 5).await;
        assert!(gate.can_admit().await.unwrap());
    }

    #[tokio::test]
    async fn zero_ceiling_never_admits() {
        let store = InMemoryDocumentStore::arc();
        let gate = AdmissionGate::new(store, 0);
        assert!(!gate.can_admit().await.unwrap());
    }
}
