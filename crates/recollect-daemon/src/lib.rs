//! # Recollect Daemon
//!
//! Process-level wiring around `recollect-core`:
//!
//! - Configuration from `RECOLLECT_*` environment variables
//! - Tracing setup (text or JSON on stderr)
//! - A console messenger for review sessions
//! - The background service hosting the dispatch and consolidation loops

pub mod config;
pub mod logging;
pub mod messenger;
pub mod service;

pub use config::{ConfigError, DaemonConfig, LogFormat};
pub use logging::init_tracing;
pub use messenger::ConsoleMessenger;
pub use service::BackgroundService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
