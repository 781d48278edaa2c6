//! Timer-driven workers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::WorkerHandle;
use crate::jobs::{CleanupSweeper, DocumentStore, PollingSweeper};

/// One unit of periodic work. Failures are logged by the implementation.
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(&self);
}

#[async_trait]
impl<S: DocumentStore> PeriodicJob for PollingSweeper<S> {
    fn name(&self) -> &'static str {
        "polling-sweeper"
    }

    async fn run(&self) {
        if let Err(err) = self.run_once().await {
            error!(error = %err, "polling sweep aborted");
        }
    }
}

#[async_trait]
impl<S: DocumentStore> PeriodicJob for CleanupSweeper<S> {
    fn name(&self) -> &'static str {
        "cleanup-sweeper"
    }

    async fn run(&self) {
        if let Err(err) = self.run_once().await {
            error!(error = %err, "cleanup sweep aborted");
        }
    }
}

/// Run `job` every `period`, starting immediately.
///
/// Missed ticks are skipped, so a run that overlaps its period never causes
/// a burst of catch-up runs. Shutdown is only observed between runs.
pub fn spawn_periodic<J: PeriodicJob>(job: Arc<J>, period: Duration) -> WorkerHandle {
    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let name = job.name();

    let join = tokio::spawn(async move {
        info!(worker = name, period_secs = period.as_secs(), "periodic worker started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = signal.notified() => {
                    info!(worker = name, "periodic worker received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    job.run().await;
                }
            }
        }
    });

    WorkerHandle::new(name, shutdown, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl PeriodicJob for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_every_period_until_shutdown() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_periodic(counter.clone(), Duration::from_secs(60));

        // First tick fires immediately, then once per period.
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);
    }
}
