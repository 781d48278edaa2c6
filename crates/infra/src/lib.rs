//! Infrastructure layer: document store, job pipeline, settlement steps and
//! background workers.

pub mod config;
pub mod jobs;
pub mod pipeline;
pub mod settlement;
pub mod workers;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineHandle};
