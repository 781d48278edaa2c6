//! Label-naming boundary.
//!
//! The naming service proposes one label per battle side. Its output is
//! untrusted: callers validate it with [`crate::LabelPolicy`] before anything
//! is written to the job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_core::Participant;

/// Input for one naming call.
///
/// `my` is the winner's side and `enemy` the loser's. The origin and region
/// names are passed so the service can avoid them; callers still enforce
/// that with [`crate::LabelPolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingRequest {
    pub my_intro: String,
    pub enemy_intro: String,
    pub battle_log: String,
    pub winner_name: String,
    pub origin_names: [String; 2],
    pub region_names: [String; 2],
}

impl NamingRequest {
    pub fn for_battle(winner: &Participant, loser: &Participant, battle_log: impl Into<String>) -> Self {
        Self {
            my_intro: winner.intro.clone(),
            enemy_intro: loser.intro.clone(),
            battle_log: battle_log.into(),
            winner_name: winner.name.clone(),
            origin_names: [winner.origin_name.clone(), loser.origin_name.clone()],
            region_names: [winner.region_name.clone(), loser.region_name.clone()],
        }
    }

    /// The proper nouns a label must not contain. Blank names are skipped.
    pub fn forbidden_names(&self) -> impl Iterator<Item = &str> {
        self.origin_names
            .iter()
            .chain(self.region_names.iter())
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }
}

/// Raw service output: `label_a` names the winner, `label_b` the loser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPair {
    pub label_a: String,
    pub label_b: String,
}

impl LabelPair {
    pub fn new(label_a: impl Into<String>, label_b: impl Into<String>) -> Self {
        Self {
            label_a: label_a.into(),
            label_b: label_b.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("naming service unavailable: {0}")]
    Unavailable(String),

    #[error("naming service timed out")]
    Timeout,

    /// Output could not be interpreted as two labels (e.g. safety truncation).
    #[error("malformed naming output: {0}")]
    Malformed(String),
}

impl NamingError {
    /// Stable diagnostic code recorded on the job document.
    pub fn code(&self) -> &'static str {
        match self {
            NamingError::Unavailable(_) => "naming_unavailable",
            NamingError::Timeout => "naming_timeout",
            NamingError::Malformed(_) => "malformed_output",
        }
    }
}

/// External generative-text service producing a symbolic label pair.
#[async_trait]
pub trait NamingService: Send + Sync + 'static {
    async fn name_pair(&self, request: &NamingRequest) -> Result<LabelPair, NamingError>;
}

/// Deterministic local namer for development and demos.
///
/// Picks epithets by hashing the battle log so the same battle always gets
/// the same labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpithetNamer;

const WINNER_EPITHETS: &[&str] = &["Iron Crown", "Dawnbreaker", "Storm Herald", "Last Ember"];
const LOSER_EPITHETS: &[&str] = &["Fallen Star", "Quiet Ash", "Broken Oath", "Pale Echo"];

#[async_trait]
impl NamingService for EpithetNamer {
    async fn name_pair(&self, request: &NamingRequest) -> Result<LabelPair, NamingError> {
        let seed = request
            .battle_log
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        Ok(LabelPair::new(
            WINNER_EPITHETS[seed % WINNER_EPITHETS.len()],
            LOSER_EPITHETS[seed % LOSER_EPITHETS.len()],
        ))
    }
}
