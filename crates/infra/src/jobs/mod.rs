//! Battle job queue: storage, admission, dispatch and processing.
//!
//! ## Design
//!
//! - One document per battle; `status` only moves forward
//! - Two dispatch paths share the queue: an event-driven trigger (admission
//!   gated, chains to the next queued job) and a periodic polling sweeper
//!   (not gated, fans out per round)
//! - Both paths claim through the same transactional CAS, so at most one
//!   caller ever moves a given job into `processing`
//! - Failed, never-finished jobs are purged by the cleanup sweeper
//!
//! ## Components
//!
//! - `DocumentStore`: transactional job + participant storage
//! - `AdmissionGate`: soft ceiling on concurrently processing jobs
//! - `DispatchTrigger`: per-creation entry point
//! - `JobProcessor`: resolves one claimed job
//! - `PollingSweeper` / `CleanupSweeper`: periodic recovery and purge

pub mod admission;
pub mod cleanup;
pub mod dispatch;
pub mod processor;
pub mod resolver;
pub mod store;
pub mod sweeper;
pub mod types;

pub use admission::{AdmissionGate, DEFAULT_ADMISSION_CEILING};
pub use cleanup::{CleanupReport, CleanupSweeper};
pub use dispatch::{DispatchOutcome, DispatchTrigger, claim};
pub use processor::{JobProcessor, ProcessError, ProcessOutcome};
pub use resolver::ScoreBattleResolver;
pub use store::{Cas, DocumentStore, InMemoryDocumentStore, StoreError, Transaction};
pub use sweeper::{PollingSweeper, SweepReport, SweepSettings};
pub use types::{ArtifactStatus, BattleJob, JOBS_COLLECTION, JobEvent, JobStatus};
