//! Collaborator fakes

mod fixtures;

pub use fixtures::{FailingIndex, RecordingMessenger};
