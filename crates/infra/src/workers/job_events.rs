//! Routes job change events to the pipeline components.
//!
//! - `created` → dispatch trigger
//! - `updated` → rating settlement and artifact lock, as two separate tasks
//! - `deleted` → ignored
//!
//! Delivery is at-least-once from the components' point of view: every
//! handler re-validates its precondition inside a transaction.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use arena_events::{DocumentChange, Subscription};

use super::WorkerHandle;
use crate::jobs::{DispatchTrigger, DocumentStore, JobEvent};
use crate::settlement::{ArtifactGenerationLock, RatingSettlement};

pub struct JobEventWorker<S> {
    dispatch: Arc<DispatchTrigger<S>>,
    rating: Arc<RatingSettlement<S>>,
    artifact: Arc<ArtifactGenerationLock<S>>,
}

impl<S: DocumentStore> JobEventWorker<S> {
    pub fn new(
        dispatch: Arc<DispatchTrigger<S>>,
        rating: Arc<RatingSettlement<S>>,
        artifact: Arc<ArtifactGenerationLock<S>>,
    ) -> Self {
        Self {
            dispatch,
            rating,
            artifact,
        }
    }

    /// Spawn the router on the current tokio runtime.
    ///
    /// On shutdown the worker stops reading events and waits for handlers
    /// already running, so no claimed job is abandoned mid-flight.
    pub fn spawn(self, mut events: Subscription<JobEvent>) -> WorkerHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            info!("job event worker started");
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    _ = signal.notified() => {
                        info!("job event worker received shutdown signal");
                        break;
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(err) = joined {
                            warn!(error = %err, "job event handler panicked");
                        }
                    }
                    event = events.recv() => {
                        let Some(event) = event else {
                            debug!("job event stream closed");
                            break;
                        };
                        self.route(event, &mut in_flight);
                    }
                }
            }

            while let Some(joined) = in_flight.join_next().await {
                if let Err(err) = joined {
                    warn!(error = %err, "job event handler panicked");
                }
            }
            info!("job event worker stopped");
        });

        WorkerHandle::new("job-events", shutdown, join)
    }

    fn route(&self, event: JobEvent, in_flight: &mut JoinSet<()>) {
        let sequence = event.sequence_number();
        match event.into_change() {
            DocumentChange::Created { document } => {
                trace!(sequence, job_id = %document.id, "job created");
                let dispatch = self.dispatch.clone();
                in_flight.spawn(async move {
                    let outcome = dispatch.on_job_created(document.id).await;
                    debug!(job_id = %document.id, ?outcome, "dispatch finished");
                });
            }
            DocumentChange::Updated { after, .. } => {
                trace!(sequence, job_id = %after.id, status = %after.status, "job updated");
                // Cheap pre-filters; each step re-checks inside its transaction.
                if after.needs_rating_settlement() {
                    let rating = self.rating.clone();
                    let job = after.clone();
                    in_flight.spawn(async move {
                        rating.on_job_updated(&job).await;
                    });
                }
                if after.artifact_lock_available() {
                    let artifact = self.artifact.clone();
                    in_flight.spawn(async move {
                        artifact.on_job_updated(&after).await;
                    });
                }
            }
            DocumentChange::Deleted { document } => {
                trace!(sequence, job_id = %document.id, "job deleted");
            }
        }
    }
}
