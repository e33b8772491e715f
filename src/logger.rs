//! Injectable logging seam.
//!
//! Every component that logs receives an `Arc<dyn Logger>` at construction;
//! there is no crate-private global sink. The default implementation forwards
//! to the `log` facade, so `env_logger` (or any other backend) picks the
//! records up in binaries that initialize one.

use std::sync::Arc;

/// Minimal logging sink contract: any implementation with these three
/// levels can be injected into the client.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink that forwards to the `log` crate macros.
#[derive(Debug, Default)]
pub struct StdLogger;

impl Logger for StdLogger {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// Discards everything. Used by tests that only care about call flow.
#[derive(Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Convenience for the common "no logger supplied" path.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(StdLogger)
}
