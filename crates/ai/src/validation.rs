//! Validation of naming-service output before it is persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::{LabelPair, NamingRequest};

/// Default label ceiling, counted in characters (one per CJK glyph).
pub const DEFAULT_MAX_LABEL_CHARS: usize = 12;

/// Which side of the battle a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSide {
    Winner,
    Loser,
}

impl core::fmt::Display for LabelSide {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LabelSide::Winner => f.write_str("winner"),
            LabelSide::Loser => f.write_str("loser"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("{side} label is empty")]
    Empty { side: LabelSide },

    #[error("{side} label has {chars} characters (max {max})")]
    TooLong {
        side: LabelSide,
        chars: usize,
        max: usize,
    },

    #[error("{side} label contains forbidden name '{name}'")]
    ForbiddenName { side: LabelSide, name: String },
}

impl LabelError {
    /// Stable diagnostic code recorded on the job document.
    pub fn code(&self) -> &'static str {
        match self {
            LabelError::Empty { .. } => "empty_label",
            LabelError::TooLong { .. } => "label_too_long",
            LabelError::ForbiddenName { .. } => "forbidden_name",
        }
    }
}

/// Labels that passed validation, keyed by battle side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLabels {
    pub winner: String,
    pub loser: String,
}

/// Length and content rules for generated labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPolicy {
    pub max_chars: usize,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_LABEL_CHARS,
        }
    }
}

impl LabelPolicy {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Trim and check both labels. Nothing partial is returned: either both
    /// labels pass or the first violation is reported.
    pub fn validate(
        &self,
        pair: &LabelPair,
        request: &NamingRequest,
    ) -> Result<ArtifactLabels, LabelError> {
        let winner = self.check(LabelSide::Winner, &pair.label_a, request)?;
        let loser = self.check(LabelSide::Loser, &pair.label_b, request)?;
        Ok(ArtifactLabels { winner, loser })
    }

    fn check(
        &self,
        side: LabelSide,
        raw: &str,
        request: &NamingRequest,
    ) -> Result<String, LabelError> {
        let label = raw.trim();
        if label.is_empty() {
            return Err(LabelError::Empty { side });
        }

        let chars = label.chars().count();
        if chars > self.max_chars {
            return Err(LabelError::TooLong {
                side,
                chars,
                max: self.max_chars,
            });
        }

        let folded = label.to_lowercase();
        if let Some(name) = request
            .forbidden_names()
            .find(|name| folded.contains(&name.to_lowercase()))
        {
            return Err(LabelError::ForbiddenName {
                side,
                name: name.to_string(),
            });
        }

        Ok(label.to_string())
    }
}
