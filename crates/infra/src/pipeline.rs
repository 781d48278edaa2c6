//! Wiring of every pipeline component over one document store.

use std::sync::Arc;

use tracing::info;

use arena_ai::NamingService;
use arena_core::BattleResolver;
use arena_events::Subscription;

use crate::config::PipelineConfig;
use crate::jobs::{
    AdmissionGate, CleanupSweeper, DispatchTrigger, DocumentStore, JobEvent, JobProcessor,
    PollingSweeper,
};
use crate::settlement::{ArtifactGenerationLock, RatingSettlement};
use crate::workers::{JobEventWorker, WorkerHandle, spawn_periodic};

/// All components, sharing one store.
pub struct Pipeline<S> {
    store: Arc<S>,
    config: PipelineConfig,
    dispatch: Arc<DispatchTrigger<S>>,
    sweeper: Arc<PollingSweeper<S>>,
    cleanup: Arc<CleanupSweeper<S>>,
    rating: Arc<RatingSettlement<S>>,
    artifact: Arc<ArtifactGenerationLock<S>>,
}

impl<S: DocumentStore> Pipeline<S> {
    pub fn new(
        store: Arc<S>,
        resolver: Arc<dyn BattleResolver>,
        naming: Arc<dyn NamingService>,
        config: PipelineConfig,
    ) -> Self {
        let processor = Arc::new(JobProcessor::new(store.clone(), resolver));
        let gate = AdmissionGate::new(store.clone(), config.admission_ceiling);
        let dispatch = Arc::new(DispatchTrigger::new(store.clone(), gate, processor.clone()));
        let sweeper = Arc::new(PollingSweeper::new(
            store.clone(),
            processor,
            config.sweep_settings(),
        ));
        let cleanup = Arc::new(CleanupSweeper::new(store.clone()));
        let rating = Arc::new(RatingSettlement::new(store.clone()));
        let artifact = Arc::new(
            ArtifactGenerationLock::new(store.clone(), naming, config.label_policy())
                .with_naming_timeout(config.naming_timeout),
        );

        Self {
            store,
            config,
            dispatch,
            sweeper,
            cleanup,
            rating,
            artifact,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &Arc<DispatchTrigger<S>> {
        &self.dispatch
    }

    pub fn sweeper(&self) -> &Arc<PollingSweeper<S>> {
        &self.sweeper
    }

    pub fn cleanup(&self) -> &Arc<CleanupSweeper<S>> {
        &self.cleanup
    }

    pub fn rating(&self) -> &Arc<RatingSettlement<S>> {
        &self.rating
    }

    pub fn artifact(&self) -> &Arc<ArtifactGenerationLock<S>> {
        &self.artifact
    }

    /// Start the event router and both periodic sweepers.
    ///
    /// `events` must be subscribed to the bus the store publishes on.
    pub fn spawn(&self, events: Subscription<JobEvent>) -> PipelineHandle {
        let router = JobEventWorker::new(
            self.dispatch.clone(),
            self.rating.clone(),
            self.artifact.clone(),
        )
        .spawn(events);
        let sweeper = spawn_periodic(self.sweeper.clone(), self.config.sweep_period);
        let cleanup = spawn_periodic(self.cleanup.clone(), self.config.cleanup_period);

        info!(
            admission_ceiling = self.config.admission_ceiling,
            sweep_period_secs = self.config.sweep_period.as_secs(),
            cleanup_period_secs = self.config.cleanup_period.as_secs(),
            "battle pipeline started"
        );
        PipelineHandle {
            workers: vec![router, sweeper, cleanup],
        }
    }
}

/// Running pipeline workers.
#[derive(Debug)]
pub struct PipelineHandle {
    workers: Vec<WorkerHandle>,
}

impl PipelineHandle {
    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.iter().map(WorkerHandle::name).collect()
    }

    /// Stop every worker, letting in-flight work finish.
    pub async fn shutdown(self) {
        for worker in self.workers {
            worker.shutdown().await;
        }
        info!("battle pipeline stopped");
    }
}
