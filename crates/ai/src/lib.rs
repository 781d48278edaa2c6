//! `arena-ai`
//!
//! **Responsibility:** generative-text service boundaries.
//!
//! This crate is intentionally **not** part of the job pipeline:
//! - It must not read or write job documents.
//! - Services return text; callers validate it before persisting anything.

pub mod narration;
pub mod naming;
pub mod validation;

pub use narration::{NarrationError, NarrationRequest, NarrationService, TemplateNarrator};
pub use naming::{EpithetNamer, LabelPair, NamingError, NamingRequest, NamingService};
pub use validation::{ArtifactLabels, DEFAULT_MAX_LABEL_CHARS, LabelError, LabelPolicy, LabelSide};
