//! Post-resolution settlement steps.
//!
//! Both steps react to the same job update event and run independently: a
//! failing rating settlement never holds back artifact generation, and the
//! reverse. Each step guards itself with its own flag on the job document.

pub mod artifact;
pub mod rating;

pub use artifact::{ArtifactGenerationLock, ArtifactOutcome};
pub use rating::{RatingOutcome, RatingSettlement};

use arena_ai::{LabelError, NamingError};
use arena_core::{DomainError, JobId, ParticipantId};

use crate::jobs::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),
    #[error("job {0} has no resolved outcome")]
    Unresolved(JobId),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Domain(DomainError),
    #[error(transparent)]
    Store(StoreError),
}

impl SettlementError {
    /// Stable diagnostic code; prefixes `artifactError`.
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::JobNotFound(_) => "job_not_found",
            SettlementError::ParticipantNotFound(_) => "participant_not_found",
            SettlementError::Unresolved(_) => "unresolved_job",
            SettlementError::Naming(err) => err.code(),
            SettlementError::Label(err) => err.code(),
            SettlementError::Domain(_) => "invalid_state",
            SettlementError::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::JobNotFound(id) => SettlementError::JobNotFound(id),
            StoreError::ParticipantNotFound(id) => SettlementError::ParticipantNotFound(id),
            StoreError::Domain(err) => SettlementError::Domain(err),
            other => SettlementError::Store(other),
        }
    }
}

impl From<DomainError> for SettlementError {
    fn from(err: DomainError) -> Self {
        SettlementError::Domain(err)
    }
}
