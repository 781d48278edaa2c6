//! Rating-bearing battle participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::ParticipantId;
use crate::rating::MAX_RATING;

/// Rating assumed for a participant that has never been rated.
pub const DEFAULT_RATING: i64 = 1000;

/// A participant document.
///
/// `rating` is optional on the wire: older documents were created before
/// ratings existed and read as [`DEFAULT_RATING`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Narrative self-introduction fed to the naming service.
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub origin_name: String,
    #[serde(default)]
    pub region_name: String,
    /// Battle power compared by the score resolver.
    #[serde(default)]
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub battle_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_battle_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            intro: String::new(),
            origin_name: String::new(),
            region_name: String::new(),
            score,
            rating: None,
            battle_count: 0,
            last_battle_at: None,
        }
    }

    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = intro.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>, region: impl Into<String>) -> Self {
        self.origin_name = origin.into();
        self.region_name = region.into();
        self
    }

    pub fn with_rating(mut self, rating: i64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Current rating, falling back to [`DEFAULT_RATING`].
    pub fn rating_or_default(&self) -> i64 {
        self.rating.unwrap_or(DEFAULT_RATING)
    }

    /// Record the result of one settled battle.
    pub fn record_battle(&mut self, new_rating: i64, at: DateTime<Utc>) {
        self.rating = Some(new_rating);
        self.battle_count = self.battle_count.saturating_add(1);
        self.last_battle_at = Some(at);
    }

    /// Validate a participant before it is registered.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("participant name must not be empty"));
        }
        if let Some(rating) = self.rating {
            if rating < 0 {
                return Err(DomainError::validation("rating must not be negative"));
            }
            if rating > MAX_RATING {
                return Err(DomainError::validation(format!(
                    "rating must not exceed {MAX_RATING}"
                )));
            }
        }
        Ok(())
    }
}

impl Entity for Participant {
    type Id = ParticipantId;

    fn id(&self) -> ParticipantId {
        self.id
    }
}
