//! Battle narration boundary.
//!
//! Narration text is opaque to the pipeline: it is produced once during
//! resolution, stored on the job as the battle log and later handed to the
//! naming service unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_core::Participant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub winner_name: String,
    pub winner_score: u32,
    pub loser_name: String,
    pub loser_score: u32,
}

impl NarrationRequest {
    pub fn new(winner: &Participant, loser: &Participant) -> Self {
        Self {
            winner_name: winner.name.clone(),
            winner_score: winner.score,
            loser_name: loser.name.clone(),
            loser_score: loser.score,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("narration service unavailable: {0}")]
    Unavailable(String),

    #[error("narration service timed out")]
    Timeout,

    /// The service answered with no text; the log feeds naming later.
    #[error("narration service returned an empty battle log")]
    Empty,
}

impl NarrationError {
    pub fn code(&self) -> &'static str {
        match self {
            NarrationError::Unavailable(_) => "narration_unavailable",
            NarrationError::Timeout => "narration_timeout",
            NarrationError::Empty => "empty_battle_log",
        }
    }
}

/// Generative-text service producing the battle log.
#[async_trait]
pub trait NarrationService: Send + Sync + 'static {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

/// Fixed-template narrator; no external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

#[async_trait]
impl NarrationService for TemplateNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        Ok(format!(
            "{} ({}) overcame {} ({}).",
            request.winner_name, request.winner_score, request.loser_name, request.loser_score
        ))
    }
}
