//! Recollect end-to-end test support
//!
//! - `harness`: temporary databases with seeding and backdating helpers
//! - `mocks`: recording and failing collaborators

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::{FailingIndex, RecordingMessenger};
