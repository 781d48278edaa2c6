//! Document store abstraction and the in-memory implementation.
//!
//! All coordination between dispatch paths and settlement steps happens
//! through [`DocumentStore::transaction`]: the closure re-reads the documents
//! it depends on, re-validates its precondition and either stages writes and
//! returns [`Cas::Committed`] or returns [`Cas::Aborted`] and writes nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use arena_core::{DomainError, JobId, Participant, ParticipantId};
use arena_events::{DocumentChange, EventBus, InMemoryEventBus};

use super::types::{BattleJob, JOBS_COLLECTION, JobEvent, JobStatus};

/// Outcome of a compare-and-set transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cas<T> {
    /// The precondition held and all staged writes were applied.
    Committed(T),
    /// The precondition no longer held; nothing was written.
    Aborted(String),
}

impl<T> Cas<T> {
    pub fn abort(reason: impl Into<String>) -> Self {
        Cas::Aborted(reason.into())
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Cas::Committed(_))
    }

    pub fn committed(self) -> Option<T> {
        match self {
            Cas::Committed(value) => Some(value),
            Cas::Aborted(_) => None,
        }
    }
}

/// Document store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Read/write view used inside a transaction.
///
/// Reads observe the transaction's own staged writes. Staged writes become
/// visible to others only when the closure returns [`Cas::Committed`].
pub trait Transaction {
    fn job(&self, id: JobId) -> Option<BattleJob>;
    fn put_job(&mut self, job: BattleJob);
    fn delete_job(&mut self, id: JobId);
    fn participant(&self, id: ParticipantId) -> Option<Participant>;
    fn put_participant(&mut self, participant: Participant);
}

/// The shared job collection plus the participant collection.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a new job document.
    async fn insert_job(&self, job: BattleJob) -> Result<JobId, StoreError>;

    async fn get_job(&self, id: JobId) -> Result<Option<BattleJob>, StoreError>;

    async fn count_jobs_by_status(&self, status: JobStatus) -> Result<usize, StoreError>;

    /// Jobs with `status`, oldest `createdAt` first.
    async fn query_jobs(
        &self,
        status: JobStatus,
        limit: usize,
    ) -> Result<Vec<BattleJob>, StoreError>;

    async fn insert_participant(
        &self,
        participant: Participant,
    ) -> Result<ParticipantId, StoreError>;

    async fn get_participant(&self, id: ParticipantId)
    -> Result<Option<Participant>, StoreError>;

    /// Run `f` atomically. Returning `Err` or [`Cas::Aborted`] discards every
    /// staged write.
    async fn transaction<T, F>(&self, f: F) -> Result<Cas<T>, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Transaction) -> Result<Cas<T>, StoreError> + Send + 'static;
}

#[derive(Debug, Default)]
struct StoreState {
    jobs: HashMap<JobId, BattleJob>,
    participants: HashMap<ParticipantId, Participant>,
    sequence: u64,
}

/// Staged writes over a locked [`StoreState`].
struct StagedTransaction<'a> {
    state: &'a StoreState,
    jobs: HashMap<JobId, Option<BattleJob>>,
    participants: HashMap<ParticipantId, Participant>,
}

impl Transaction for StagedTransaction<'_> {
    fn job(&self, id: JobId) -> Option<BattleJob> {
        match self.jobs.get(&id) {
            Some(staged) => staged.clone(),
            None => self.state.jobs.get(&id).cloned(),
        }
    }

    fn put_job(&mut self, job: BattleJob) {
        self.jobs.insert(job.id, Some(job));
    }

    fn delete_job(&mut self, id: JobId) {
        self.jobs.insert(id, None);
    }

    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.participants
            .get(&id)
            .or_else(|| self.state.participants.get(&id))
            .cloned()
    }

    fn put_participant(&mut self, participant: Participant) {
        self.participants.insert(participant.id, participant);
    }
}

/// In-memory document store for tests/dev and single-process runs.
///
/// Transactions are serialisable (one global lock). Every committed job
/// mutation is published on the attached bus, modelling document triggers.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<StoreState>,
    bus: Option<Arc<InMemoryEventBus<JobEvent>>>,
    latency: Duration,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish job change events on `bus`.
    pub fn with_bus(mut self, bus: Arc<InMemoryEventBus<JobEvent>>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Simulated round-trip time added before every operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))
    }

    fn publish(&self, state: &mut StoreState, change: DocumentChange<BattleJob>) {
        let Some(bus) = &self.bus else {
            return;
        };
        state.sequence += 1;
        let envelope = JobEvent::new(JOBS_COLLECTION, state.sequence, change);
        if let Err(err) = bus.publish(envelope) {
            warn!(error = %err, "failed to publish job change event");
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_job(&self, job: BattleJob) -> Result<JobId, StoreError> {
        self.round_trip().await;
        let mut state = self.lock()?;
        if state.jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id.to_string()));
        }
        let id = job.id;
        state.jobs.insert(id, job.clone());
        self.publish(&mut state, DocumentChange::Created { document: job });
        Ok(id)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<BattleJob>, StoreError> {
        self.round_trip().await;
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn count_jobs_by_status(&self, status: JobStatus) -> Result<usize, StoreError> {
        self.round_trip().await;
        Ok(self
            .lock()?
            .jobs
            .values()
            .filter(|j| j.status == status)
            .count())
    }

    async fn query_jobs(
        &self,
        status: JobStatus,
        limit: usize,
    ) -> Result<Vec<BattleJob>, StoreError> {
        self.round_trip().await;
        let state = self.lock()?;
        let mut result: Vec<_> = state
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();

        // FIFO by creation time; id breaks ties (UUIDv7 is time-ordered).
        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        Ok(result)
    }

    async fn insert_participant(
        &self,
        participant: Participant,
    ) -> Result<ParticipantId, StoreError> {
        self.round_trip().await;
        let mut state = self.lock()?;
        if state.participants.contains_key(&participant.id) {
            return Err(StoreError::AlreadyExists(participant.id.to_string()));
        }
        let id = participant.id;
        state.participants.insert(id, participant);
        Ok(id)
    }

    async fn get_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, StoreError> {
        self.round_trip().await;
        Ok(self.lock()?.participants.get(&id).cloned())
    }

    async fn transaction<T, F>(&self, f: F) -> Result<Cas<T>, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Transaction) -> Result<Cas<T>, StoreError> + Send + 'static,
    {
        self.round_trip().await;
        let mut state = self.lock()?;

        let mut staged = StagedTransaction {
            state: &state,
            jobs: HashMap::new(),
            participants: HashMap::new(),
        };
        let outcome = f(&mut staged)?;
        let StagedTransaction {
            jobs, participants, ..
        } = staged;

        if !outcome.is_committed() {
            return Ok(outcome);
        }

        for (id, participant) in participants {
            state.participants.insert(id, participant);
        }
        for (id, staged_job) in jobs {
            let before = state.jobs.get(&id).cloned();
            match (before, staged_job) {
                (None, Some(job)) => {
                    state.jobs.insert(id, job.clone());
                    self.publish(&mut state, DocumentChange::Created { document: job });
                }
                (Some(before), Some(after)) => {
                    if before == after {
                        continue;
                    }
                    state.jobs.insert(id, after.clone());
                    self.publish(&mut state, DocumentChange::Updated { before, after });
                }
                (Some(document), None) => {
                    state.jobs.remove(&id);
                    self.publish(&mut state, DocumentChange::Deleted { document });
                }
                (None, None) => {}
            }
        }

        Ok(outcome)
    }
}
