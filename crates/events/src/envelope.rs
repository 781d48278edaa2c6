use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a document.
///
/// Updates carry both snapshots so consumers can react to the transition
/// without an extra read; they must still re-read inside their own
/// transaction before writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentChange<D> {
    Created { document: D },
    Updated { before: D, after: D },
    Deleted { document: D },
}

impl<D> DocumentChange<D> {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentChange::Created { .. } => "created",
            DocumentChange::Updated { .. } => "updated",
            DocumentChange::Deleted { .. } => "deleted",
        }
    }

    /// The document as it is after the change (or as it was, for deletes).
    pub fn current(&self) -> &D {
        match self {
            DocumentChange::Created { document } => document,
            DocumentChange::Updated { after, .. } => after,
            DocumentChange::Deleted { document } => document,
        }
    }
}

/// Envelope for one document change.
///
/// `sequence_number` is monotonically increasing per store; it is diagnostic
/// only and consumers do not depend on gap-free delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEnvelope<D> {
    event_id: Uuid,
    collection: String,
    sequence_number: u64,
    occurred_at: DateTime<Utc>,
    change: DocumentChange<D>,
}

impl<D> ChangeEnvelope<D> {
    pub fn new(
        collection: impl Into<String>,
        sequence_number: u64,
        change: DocumentChange<D>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            collection: collection.into(),
            sequence_number,
            occurred_at: Utc::now(),
            change,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn change(&self) -> &DocumentChange<D> {
        &self.change
    }

    pub fn into_change(self) -> DocumentChange<D> {
        self.change
    }
}
