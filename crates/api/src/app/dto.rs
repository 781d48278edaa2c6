use serde::Deserialize;

use arena_core::Participant;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParticipantRequest {
    pub name: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub origin_name: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    /// Omitted means the default rating applies at settlement time.
    #[serde(default)]
    pub rating: Option<i64>,
}

impl RegisterParticipantRequest {
    pub fn into_participant(self) -> Participant {
        let mut participant = Participant::new(self.name, self.score)
            .with_intro(self.intro.unwrap_or_default())
            .with_origin(
                self.origin_name.unwrap_or_default(),
                self.region_name.unwrap_or_default(),
            );
        participant.rating = self.rating;
        participant
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleRequest {
    pub participant_a: String,
    pub participant_b: String,
    #[serde(default)]
    pub artifact_eligible: bool,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ListBattlesQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}
