//! Cargo Sweeper - clean build artifacts of every Rust project under a directory
//!
//! This crate provides functionality for:
//! - Discovering Cargo projects and collapsing workspace members into their root
//! - Cleaning artifact directories in parallel with a primary and fallback strategy
//! - Finding (and optionally removing) unused dependencies

pub mod cleaner;
pub mod cli;
pub mod commands;
pub mod config;
pub mod deps;
pub mod discovery;
pub mod error;
pub mod output;
pub mod signals;
pub mod size;

// Re-export commonly used types
pub use cleaner::{Orchestrator, RunSummary};
pub use config::Config;
pub use discovery::{discover, ProjectKind, ProjectRoot};
pub use error::{Result, SweeperError};
