//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes document change events to background consumers
//! (dispatch trigger, settlement steps). It makes minimal assumptions:
//!
//! - **Transport-agnostic**: in-memory channels today; a broker later.
//! - **At-least-once delivery**: an event may be delivered more than once;
//!   consumers must be idempotent.
//! - **No persistence**: the document store is the source of truth. A lost
//!   event is recovered by the periodic sweepers, not by the bus.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to an event stream.
///
/// Each subscription receives a copy of every event published after it was
/// created (broadcast semantics). A subscription is meant to be drained by a
/// single task.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus has been dropped.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ```text
/// DocumentStore (commit) → EventBus (publish) → Consumers
///                                                  ├─ DispatchTrigger
///                                                  ├─ RatingSettlement
///                                                  └─ ArtifactGenerationLock
/// ```
///
/// Documents are **committed first**, then published. Publishing never
/// blocks the committing transaction.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
