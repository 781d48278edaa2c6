//! In-process wiring: document store + change bus + battle pipeline.

use std::sync::Arc;

use arena_ai::{EpithetNamer, TemplateNarrator};
use arena_events::{EventBus, InMemoryEventBus};
use arena_infra::jobs::{InMemoryDocumentStore, JobEvent, ScoreBattleResolver};
use arena_infra::{Pipeline, PipelineConfig, PipelineHandle};

/// Shared state behind every handler.
pub struct AppServices {
    bus: Arc<InMemoryEventBus<JobEvent>>,
    pipeline: Pipeline<InMemoryDocumentStore>,
}

impl AppServices {
    /// In-memory store publishing on a fresh bus, with the local resolver,
    /// narrator and namer.
    pub fn in_memory(config: PipelineConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryDocumentStore::new().with_bus(bus.clone()));
        let resolver = Arc::new(ScoreBattleResolver::new(
            store.clone(),
            Arc::new(TemplateNarrator),
        ));
        let pipeline = Pipeline::new(store, resolver, Arc::new(EpithetNamer), config);
        Self { bus, pipeline }
    }

    /// Start the background workers. Must be called from a tokio runtime.
    pub fn start(&self) -> PipelineHandle {
        self.pipeline.spawn(self.bus.subscribe())
    }

    pub fn store(&self) -> &Arc<InMemoryDocumentStore> {
        self.pipeline.store()
    }

    pub fn pipeline(&self) -> &Pipeline<InMemoryDocumentStore> {
        &self.pipeline
    }
}
