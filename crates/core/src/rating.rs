//! Rating adjustment applied when a battle is settled.
//!
//! The delta is a pure function of the two ratings before the battle:
//!
//! - **Base delta**: `20 × (1 − expected)` where `expected` is the winner's
//!   logistic win expectancy on a 400-point scale, rounded and clamped to
//!   `[1, 20]`.
//! - **Loser**: loses the base delta, halved (rounded up) below the novice
//!   tier. Ratings never go below zero.
//! - **Winner**: gains the base delta times a bonus multiplier (upset 1.5,
//!   rookie tier 1.25, otherwise 1.0). Gains and losses are deliberately
//!   asymmetric.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Maximum base delta for a single battle.
pub const BASE_K: f64 = 20.0;
/// Bonus for beating a higher-rated opponent.
pub const UPSET_MULTIPLIER: f64 = 1.5;
/// Bonus for winners still below the rookie tier ceiling.
pub const ROOKIE_MULTIPLIER: f64 = 1.25;
/// Winners rated strictly below this earn [`ROOKIE_MULTIPLIER`].
pub const ROOKIE_TIER: i64 = 1000;
/// Losers rated strictly below this only lose half the base delta.
pub const NOVICE_TIER: i64 = 800;
/// Highest rating a participant may be registered with.
pub const MAX_RATING: i64 = 1_000_000;

/// Settlement audit record written onto the job document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EloAudit {
    pub winner_before: i64,
    pub winner_after: i64,
    pub winner_delta: i64,
    pub loser_before: i64,
    pub loser_after: i64,
    pub loser_delta: i64,
}

/// The computed rating movement for one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingChange {
    pub base: i64,
    pub winner_delta: i64,
    pub loser_delta: i64,
}

impl RatingChange {
    pub fn compute(winner_rating: i64, loser_rating: i64) -> Self {
        let gap = loser_rating.saturating_sub(winner_rating) as f64;
        let expected = 1.0 / (1.0 + 10f64.powf(gap / 400.0));
        let base = (BASE_K * (1.0 - expected)).round().clamp(1.0, BASE_K) as i64;

        let multiplier = if winner_rating < loser_rating {
            UPSET_MULTIPLIER
        } else if winner_rating < ROOKIE_TIER {
            ROOKIE_MULTIPLIER
        } else {
            1.0
        };
        let winner_delta = (base as f64 * multiplier).round() as i64;

        let loss = if loser_rating < NOVICE_TIER {
            (base + 1) / 2
        } else {
            base
        };
        // Clamp at zero so the audit delta matches what is actually written.
        let loser_delta = -loss.min(loser_rating.max(0));

        Self {
            base,
            winner_delta,
            loser_delta,
        }
    }

    /// Apply to the ratings it was computed from, producing the audit record.
    ///
    /// Fails instead of wrapping when a stored rating is out of range.
    pub fn audit(&self, winner_before: i64, loser_before: i64) -> DomainResult<EloAudit> {
        let out_of_range = || {
            DomainError::invariant(format!(
                "ratings {winner_before}/{loser_before} cannot absorb the settlement delta"
            ))
        };
        Ok(EloAudit {
            winner_before,
            winner_after: winner_before
                .checked_add(self.winner_delta)
                .ok_or_else(out_of_range)?,
            winner_delta: self.winner_delta,
            loser_before,
            loser_after: loser_before
                .checked_add(self.loser_delta)
                .ok_or_else(out_of_range)?,
            loser_delta: self.loser_delta,
        })
    }
}
