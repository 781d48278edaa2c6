//! Store-backed battle resolver.

use std::sync::Arc;

use async_trait::async_trait;

use arena_ai::{NarrationError, NarrationRequest, NarrationService};
use arena_core::{BattleOutcome, BattleResolver, ParticipantId, ResolveError};

use super::store::DocumentStore;

/// Higher `score` wins; ties go to participant A. The battle log comes from
/// the narration service.
pub struct ScoreBattleResolver<S> {
    store: Arc<S>,
    narrator: Arc<dyn NarrationService>,
}

impl<S: DocumentStore> ScoreBattleResolver<S> {
    pub fn new(store: Arc<S>, narrator: Arc<dyn NarrationService>) -> Self {
        Self { store, narrator }
    }
}

#[async_trait]
impl<S: DocumentStore> BattleResolver for ScoreBattleResolver<S> {
    async fn resolve(
        &self,
        participant_a: ParticipantId,
        participant_b: ParticipantId,
    ) -> Result<BattleOutcome, ResolveError> {
        let load = |id: ParticipantId| async move {
            self.store
                .get_participant(id)
                .await
                .map_err(|e| ResolveError::Internal(e.to_string()))?
                .ok_or(ResolveError::ParticipantNotFound(id))
        };
        let a = load(participant_a).await?;
        let b = load(participant_b).await?;

        let (winner, loser) = if a.score >= b.score { (a, b) } else { (b, a) };
        let narrative_summary = self
            .narrator
            .narrate(&NarrationRequest::new(&winner, &loser))
            .await
            .and_then(|log| {
                if log.trim().is_empty() {
                    Err(NarrationError::Empty)
                } else {
                    Ok(log)
                }
            })
            .map_err(|e| ResolveError::Narration(format!("{}: {e}", e.code())))?;

        Ok(BattleOutcome {
            winner_id: winner.id,
            loser_id: loser.id,
            narrative_summary,
        })
    }
}
