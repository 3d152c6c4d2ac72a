//! Utility modules: serde helpers and logging setup.

pub mod logging;
pub mod secs;

pub use logging::init_logging;
