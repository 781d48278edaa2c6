//! Process-wide tracing setup shared by the API binary and tools.

pub mod subscriber;

pub use subscriber::{LogFormat, ENV_LOG_FORMAT};

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
