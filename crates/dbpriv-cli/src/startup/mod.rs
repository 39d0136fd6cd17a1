//! Process startup: logging and storage bootstrap

pub mod logging;
pub mod storage;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use storage::open_persistence;
