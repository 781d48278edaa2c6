//! Periodic purge of jobs that failed before producing an outcome.

use std::sync::Arc;

use tracing::{debug, info, warn};

use arena_core::JobId;

use super::store::{Cas, DocumentStore, StoreError};
use super::types::JobStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    pub deleted: usize,
    /// `error` jobs kept because they are `finished`.
    pub retained: usize,
    /// Deleted by someone else between the scan and the purge.
    pub vanished: usize,
}

/// Result of purging one scanned job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purge {
    Deleted,
    Retained,
    Vanished,
}

#[derive(Debug)]
pub struct CleanupSweeper<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CleanupSweeper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Delete every `error` job that is not `finished`.
    ///
    /// Each delete re-checks the document inside a transaction, so a job
    /// that became `finished` after the scan is never removed.
    pub async fn run_once(&self) -> Result<CleanupReport, StoreError> {
        let failed = self.store.query_jobs(JobStatus::Error, usize::MAX).await?;
        let mut report = CleanupReport {
            scanned: failed.len(),
            ..CleanupReport::default()
        };

        for job in failed {
            if job.finished {
                report.retained += 1;
                continue;
            }
            match self.purge(job.id).await {
                Ok(Purge::Deleted) => {
                    debug!(job_id = %job.id, "purged failed job");
                    report.deleted += 1;
                }
                Ok(Purge::Retained) => {
                    debug!(job_id = %job.id, "job is no longer purgeable");
                    report.retained += 1;
                }
                Ok(Purge::Vanished) => {
                    debug!(job_id = %job.id, "job already gone");
                    report.vanished += 1;
                }
                Err(err) => warn!(job_id = %job.id, error = %err, "purge failed"),
            }
        }

        if report.deleted > 0 {
            info!(
                deleted = report.deleted,
                retained = report.retained,
                "cleanup sweep finished"
            );
        }
        Ok(report)
    }

    async fn purge(&self, job_id: JobId) -> Result<Purge, StoreError> {
        let cas = self
            .store
            .transaction(move |tx| match tx.job(job_id) {
                Some(current) if current.is_purgeable() => {
                    tx.delete_job(job_id);
                    Ok(Cas::Committed(Purge::Deleted))
                }
                Some(_) => Ok(Cas::Committed(Purge::Retained)),
                // Nothing staged, so committing writes nothing.
                None => Ok(Cas::Committed(Purge::Vanished)),
            })
            .await?;
        Ok(cas.committed().unwrap_or(Purge::Retained))
    }
}
