//! `arena-events`: document change events and their transport.
//!
//! The store emits one [`ChangeEnvelope`] per committed document mutation;
//! the bus fans them out to background consumers. Delivery is at-least-once,
//! so every consumer re-validates state before acting.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{ChangeEnvelope, DocumentChange};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
