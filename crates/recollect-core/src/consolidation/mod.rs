//! Memory Consolidation Module
//!
//! Sleep-inspired daily sweep over young memories:
//! - Boost memories that are new and barely reviewed
//! - Clear boosts once a memory leaves the consolidation window
//! - Record each run in the consolidation history

mod scheduler;
mod sleep;

pub use scheduler::{ConsolidationScheduler, next_run_after};
pub use sleep::{
    ConsolidationConfig, ConsolidationReport, ConsolidationRun, ConsolidationSweep,
    priority_for_age,
};
