//! Background workers: the job event router and periodic sweeps.

pub mod job_events;
pub mod periodic;

pub use job_events::JobEventWorker;
pub use periodic::{PeriodicJob, spawn_periodic};

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: Arc<Notify>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(name: &'static str, shutdown: Arc<Notify>, join: JoinHandle<()>) -> Self {
        Self {
            name,
            shutdown,
            join: Some(join),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// Work already started (a sweep, an in-flight job) runs to completion.
    pub async fn shutdown(mut self) {
        // notify_one stores a permit if the worker is busy, so the signal is
        // seen at its next wait.
        self.shutdown.notify_one();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(worker = self.name, error = %err, "worker task ended abnormally");
            }
        }
    }
}
