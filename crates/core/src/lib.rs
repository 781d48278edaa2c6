//! `arena-core`: battle domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, participants, rating math and the battle-resolution boundary.

pub mod battle;
pub mod entity;
pub mod error;
pub mod id;
pub mod participant;
pub mod rating;

pub use battle::{BattleOutcome, BattleResolver, ResolveError};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{JobId, ParticipantId};
pub use participant::{DEFAULT_RATING, Participant};
pub use rating::{EloAudit, MAX_RATING, RatingChange};
