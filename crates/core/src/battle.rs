//! Battle resolution boundary.
//!
//! Resolution is owned by business logic outside the job pipeline. The
//! pipeline only needs the outcome and must not rely on the resolver having
//! any side effects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::ParticipantId;

/// Result of resolving one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutcome {
    pub winner_id: ParticipantId,
    pub loser_id: ParticipantId,
    /// Battle log text; later fed to the naming service.
    pub narrative_summary: String,
}

impl BattleOutcome {
    /// Check the outcome actually names the two participants of the battle.
    pub fn is_between(&self, a: ParticipantId, b: ParticipantId) -> bool {
        (self.winner_id == a && self.loser_id == b) || (self.winner_id == b && self.loser_id == a)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("narration failed: {0}")]
    Narration(String),

    #[error("resolver failed: {0}")]
    Internal(String),
}

/// Decides the outcome of a battle between two participants.
///
/// Implementations must not mutate shared state.
#[async_trait]
pub trait BattleResolver: Send + Sync + 'static {
    async fn resolve(
        &self,
        participant_a: ParticipantId,
        participant_b: ParticipantId,
    ) -> Result<BattleOutcome, ResolveError>;
}
