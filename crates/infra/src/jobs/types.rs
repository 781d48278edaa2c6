//! Battle job document and its state machines.
//!
//! Two independent state machines live on one document:
//!
//! ```text
//! status:          queued ─▶ processing ─┬▶ done
//!                                        └▶ error
//!
//! artifactStatus:  (absent) ─▶ creating ─┬▶ done
//!                                        └▶ error
//! ```
//!
//! Every mutation goes through a validating helper on [`BattleJob`]; the
//! helpers are only ever called inside a store transaction that re-read the
//! document first. Backwards edges on `artifactStatus` exist solely as
//! explicit operator actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arena_ai::ArtifactLabels;
use arena_core::{
    BattleOutcome, DomainError, DomainResult, EloAudit, Entity, JobId, ParticipantId,
};
use arena_events::ChangeEnvelope;

/// Collection name used on change envelopes.
pub const JOBS_COLLECTION: &str = "battle_jobs";

/// Change event for one job document.
pub type JobEvent = ChangeEnvelope<BattleJob>;

/// Dispatch status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Forward-only transition table.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            other => Err(DomainError::validation(format!("unknown job status: {other}"))),
        }
    }
}

/// Artifact-generation lock state. Absent (`None` on the job) means the lock
/// has never been taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Creating,
    Done,
    Error,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Creating => "creating",
            ArtifactStatus::Done => "done",
            ArtifactStatus::Error => "error",
        }
    }

    /// Automatic transition table (operator resets are separate).
    pub fn can_advance(from: Option<ArtifactStatus>, to: ArtifactStatus) -> bool {
        matches!(
            (from, to),
            (None, ArtifactStatus::Creating)
                | (Some(ArtifactStatus::Creating), ArtifactStatus::Done)
                | (Some(ArtifactStatus::Creating), ArtifactStatus::Error)
        )
    }
}

/// One battle job document.
///
/// Field names serialize in camelCase; the serialized form is the read
/// contract for reporting layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleJob {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub participant_a: ParticipantId,
    pub participant_b: ParticipantId,

    /// True only once the processor committed a resolved outcome. A job can
    /// be `error` without being finished (purgeable) or after it
    /// (settlement-stage failure, retained).
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loser_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_summary: Option<String>,

    #[serde(default)]
    pub elo_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elo_applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elo: Option<EloAudit>,

    #[serde(default)]
    pub artifact_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_status: Option<ArtifactStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactLabels>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl BattleJob {
    /// Create a queued job between two distinct participants.
    pub fn new(participant_a: ParticipantId, participant_b: ParticipantId) -> DomainResult<Self> {
        if participant_a == participant_b {
            return Err(DomainError::validation(
                "a battle needs two distinct participants",
            ));
        }
        Ok(Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            participant_a,
            participant_b,
            finished: false,
            winner_id: None,
            loser_id: None,
            narrative_summary: None,
            elo_applied: false,
            elo_applied_at: None,
            elo: None,
            artifact_eligible: false,
            artifact_status: None,
            artifact_requested_at: None,
            artifact_created_at: None,
            artifact_error: None,
            artifact: None,
            error_msg: None,
        })
    }

    pub fn with_artifact_eligible(mut self, eligible: bool) -> Self {
        self.artifact_eligible = eligible;
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    fn advance(&mut self, next: JobStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::transition(
                format!("job {}", self.id),
                self.status.as_str(),
                next.as_str(),
            ));
        }
        self.status = next;
        Ok(())
    }

    fn advance_artifact(&mut self, next: ArtifactStatus) -> DomainResult<()> {
        if !ArtifactStatus::can_advance(self.artifact_status, next) {
            return Err(DomainError::transition(
                format!("job {} artifact", self.id),
                self.artifact_status.map_or("absent", |s| s.as_str()),
                next.as_str(),
            ));
        }
        self.artifact_status = Some(next);
        Ok(())
    }

    /// `queued → processing`.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.advance(JobStatus::Processing)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// `processing → done` with the resolved outcome.
    pub fn mark_done(&mut self, outcome: &BattleOutcome, now: DateTime<Utc>) -> DomainResult<()> {
        if !outcome.is_between(self.participant_a, self.participant_b) {
            return Err(DomainError::invariant(format!(
                "outcome for job {} names participants outside the battle",
                self.id
            )));
        }
        self.advance(JobStatus::Done)?;
        self.finished = true;
        self.winner_id = Some(outcome.winner_id);
        self.loser_id = Some(outcome.loser_id);
        self.narrative_summary = Some(outcome.narrative_summary.clone());
        self.elo_applied = false;
        self.finished_at = Some(now);
        Ok(())
    }

    /// `processing → error`. `finished` is left untouched (false).
    pub fn mark_failed(&mut self, message: impl Into<String>) -> DomainResult<()> {
        self.advance(JobStatus::Error)?;
        self.error_msg = Some(message.into());
        Ok(())
    }

    /// Whether rating settlement still has work to do.
    pub fn needs_rating_settlement(&self) -> bool {
        self.finished && !self.elo_applied
    }

    /// Record a committed rating settlement. Flips `eloApplied` exactly once.
    pub fn apply_elo(&mut self, audit: EloAudit, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.finished {
            return Err(DomainError::invariant(format!(
                "job {} is not finished; nothing to settle",
                self.id
            )));
        }
        if self.elo_applied {
            return Err(DomainError::conflict(format!(
                "job {} already has ratings applied",
                self.id
            )));
        }
        self.elo_applied = true;
        self.elo_applied_at = Some(now);
        self.elo = Some(audit);
        Ok(())
    }

    /// Whether the artifact lock may be taken right now.
    pub fn artifact_lock_available(&self) -> bool {
        self.finished
            && self.artifact_eligible
            && self.artifact_created_at.is_none()
            && self.artifact_status.is_none()
    }

    /// `absent → creating`.
    pub fn acquire_artifact_lock(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.artifact_lock_available() {
            return Err(DomainError::conflict(format!(
                "job {} is not eligible for artifact generation",
                self.id
            )));
        }
        self.advance_artifact(ArtifactStatus::Creating)?;
        self.artifact_requested_at = Some(now);
        Ok(())
    }

    /// `creating → done`.
    pub fn complete_artifact(
        &mut self,
        labels: ArtifactLabels,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.advance_artifact(ArtifactStatus::Done)?;
        self.artifact_created_at = Some(now);
        self.artifact = Some(labels);
        self.artifact_error = None;
        Ok(())
    }

    /// `creating → error`. No artifact is written.
    pub fn fail_artifact(&mut self, message: impl Into<String>) -> DomainResult<()> {
        self.advance_artifact(ArtifactStatus::Error)?;
        self.artifact_error = Some(message.into());
        Ok(())
    }

    /// Operator action: move `expected → absent` so the job becomes eligible
    /// for artifact generation again.
    pub fn reset_artifact(&mut self, expected: ArtifactStatus) -> DomainResult<()> {
        if expected == ArtifactStatus::Done {
            return Err(DomainError::invariant(
                "a generated artifact cannot be reset",
            ));
        }
        if self.artifact_status != Some(expected) {
            return Err(DomainError::conflict(format!(
                "job {} artifact is {}, expected {}",
                self.id,
                self.artifact_status.map_or("absent", |s| s.as_str()),
                expected.as_str()
            )));
        }
        self.artifact_status = None;
        self.artifact_requested_at = None;
        self.artifact_error = None;
        Ok(())
    }

    /// Failed before resolution: holds no usable outcome.
    pub fn is_purgeable(&self) -> bool {
        self.status == JobStatus::Error && !self.finished
    }
}

impl Entity for BattleJob {
    type Id = JobId;

    fn id(&self) -> JobId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> BattleJob {
        BattleJob::new(ParticipantId::new(), ParticipantId::new()).unwrap()
    }

    fn outcome_for(job: &BattleJob) -> BattleOutcome {
        BattleOutcome {
            winner_id: job.participant_a,
            loser_id: job.participant_b,
            narrative_summary: "a won".into(),
        }
    }

    const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Done,
        JobStatus::Error,
    ];

    #[test]
    fn nothing_transitions_back_to_queued() {
        for from in ALL {
            assert!(!from.can_transition_to(JobStatus::Queued), "{from} -> queued");
        }
    }

    #[test]
    fn terminal_states_are_sinks() {
        for from in [JobStatus::Done, JobStatus::Error] {
            for to in ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn same_participant_twice_is_rejected() {
        let p = ParticipantId::new();
        assert!(BattleJob::new(p, p).is_err());
    }

    #[test]
    fn happy_path_lifecycle() {
        let mut job = job().with_artifact_eligible(true);
        let now = Utc::now();
        job.mark_processing(now).unwrap();
        assert_eq!(job.started_at, Some(now));

        let outcome = outcome_for(&job);
        job.mark_done(&outcome, now).unwrap();
        assert!(job.finished);
        assert!(job.needs_rating_settlement());
        assert!(job.artifact_lock_available());

        job.acquire_artifact_lock(now).unwrap();
        assert!(!job.artifact_lock_available());
        assert!(job.acquire_artifact_lock(now).is_err());

        job.complete_artifact(
            ArtifactLabels {
                winner: "Crown".into(),
                loser: "Ash".into(),
            },
            now,
        )
        .unwrap();
        assert_eq!(job.artifact_status, Some(ArtifactStatus::Done));
        assert!(job.reset_artifact(ArtifactStatus::Done).is_err());
    }

    #[test]
    fn failed_job_is_purgeable_only_when_unfinished() {
        let mut job = job();
        job.mark_processing(Utc::now()).unwrap();
        job.mark_failed("boom").unwrap();
        assert!(job.is_purgeable());
        assert!(!job.finished);

        job.finished = true;
        assert!(!job.is_purgeable());
    }

    #[test]
    fn cannot_finish_without_processing() {
        let mut job = job();
        let outcome = outcome_for(&job);
        assert!(job.mark_done(&outcome, Utc::now()).is_err());
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn outcome_must_name_the_battle_participants() {
        let mut job = job();
        job.mark_processing(Utc::now()).unwrap();
        let outcome = BattleOutcome {
            winner_id: ParticipantId::new(),
            loser_id: job.participant_b,
            narrative_summary: String::new(),
        };
        assert!(job.mark_done(&outcome, Utc::now()).is_err());
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn elo_applies_once() {
        let mut job = job();
        job.mark_processing(Utc::now()).unwrap();
        let outcome = outcome_for(&job);
        job.mark_done(&outcome, Utc::now()).unwrap();
        let audit = arena_core::RatingChange::compute(1000, 1000).audit(1000, 1000).unwrap();
        job.apply_elo(audit, Utc::now()).unwrap();
        assert!(matches!(
            job.apply_elo(audit, Utc::now()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn operator_reset_requires_expected_state() {
        let mut job = job().with_artifact_eligible(true);
        job.mark_processing(Utc::now()).unwrap();
        let outcome = outcome_for(&job);
        job.mark_done(&outcome, Utc::now()).unwrap();
        job.acquire_artifact_lock(Utc::now()).unwrap();
        assert!(job.reset_artifact(ArtifactStatus::Error).is_err());

        job.fail_artifact("naming_timeout: timed out").unwrap();
        assert!(!job.artifact_lock_available());

        job.reset_artifact(ArtifactStatus::Error).unwrap();
        assert_eq!(job.artifact_error, None);
        assert!(job.artifact_lock_available());
    }

    #[test]
    fn serializes_with_document_field_names() {
        let job = job().with_artifact_eligible(true);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["artifactEligible"], true);
        assert_eq!(json["eloApplied"], false);
        assert!(json.get("participantA").is_some());
        assert!(json.get("artifactStatus").is_none());
    }

    #[test]
    fn status_parses_from_wire_names() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }
}
