//! Artifact cleaning functionality.
//!
//! This module provides:
//! - Clean strategies (native `cargo clean`, direct deletion)
//! - A per-root executor with primary/fallback handling
//! - Parallel cleaning orchestration and run summaries

mod executor;
mod orchestrator;
mod strategy;

pub use executor::{CleanOptions, CleanResult, Cleaner};
pub use orchestrator::{CancelToken, CleanProgress, Orchestrator, RunSummary};
pub use strategy::{CleanStrategy, StrategyKind, StrategyOutcome};
