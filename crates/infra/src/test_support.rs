//! Shared fixtures and collaborator doubles for unit and integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use arena_ai::{LabelPair, NamingError, NamingRequest, NamingService};
use arena_core::{BattleOutcome, BattleResolver, Participant, ParticipantId, ResolveError};

use crate::jobs::{BattleJob, DocumentStore, InMemoryDocumentStore, JobProcessor};

/// Resolver that always declares participant A the winner.
#[derive(Debug, Default)]
pub struct FirstWins {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl FirstWins {
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BattleResolver for FirstWins {
    async fn resolve(
        &self,
        participant_a: ParticipantId,
        participant_b: ParticipantId,
    ) -> Result<BattleOutcome, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(BattleOutcome {
            winner_id: participant_a,
            loser_id: participant_b,
            narrative_summary: "A pressed the attack and won.".to_string(),
        })
    }
}

/// Resolver that always fails.
#[derive(Debug, Default)]
pub struct BrokenResolver;

#[async_trait]
impl BattleResolver for BrokenResolver {
    async fn resolve(
        &self,
        _participant_a: ParticipantId,
        _participant_b: ParticipantId,
    ) -> Result<BattleOutcome, ResolveError> {
        Err(ResolveError::Internal("scoreboard offline".to_string()))
    }
}

/// Naming service returning a fixed answer and counting calls.
#[derive(Debug)]
pub struct ScriptedNamer {
    answer: Result<LabelPair, NamingError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedNamer {
    pub fn returning(label_a: &str, label_b: &str) -> Self {
        Self {
            answer: Ok(LabelPair::new(label_a, label_b)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: NamingError) -> Self {
        Self {
            answer: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NamingService for ScriptedNamer {
    async fn name_pair(&self, _request: &NamingRequest) -> Result<LabelPair, NamingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.clone()
    }
}

/// Register two participants with the given ratings.
pub async fn seed_pair(
    store: &InMemoryDocumentStore,
    rating_a: i64,
    rating_b: i64,
) -> (Participant, Participant) {
    let a = Participant::new("Aria", 40)
        .with_rating(rating_a)
        .with_intro("A wandering swordswoman.")
        .with_origin("Valoria", "North Reach");
    let b = Participant::new("Bram", 20)
        .with_rating(rating_b)
        .with_intro("A stubborn shield-bearer.")
        .with_origin("Ostmark", "Southmere");
    store.insert_participant(a.clone()).await.unwrap();
    store.insert_participant(b.clone()).await.unwrap();
    (a, b)
}

/// Insert a queued job between `a` and `b`.
pub async fn queue_job(
    store: &InMemoryDocumentStore,
    a: &Participant,
    b: &Participant,
    artifact_eligible: bool,
) -> BattleJob {
    let job = BattleJob::new(a.id, b.id)
        .unwrap()
        .with_artifact_eligible(artifact_eligible);
    store.insert_job(job.clone()).await.unwrap();
    job
}

pub fn processor(
    store: &Arc<InMemoryDocumentStore>,
    resolver: Arc<dyn BattleResolver>,
) -> Arc<JobProcessor<InMemoryDocumentStore>> {
    Arc::new(JobProcessor::new(store.clone(), resolver))
}
