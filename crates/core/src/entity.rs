//! Entity trait: identity that survives document rewrites.

/// A stored document with a stable identifier.
///
/// Stores key documents by this id; it is assigned at creation and never
/// changes afterwards.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
