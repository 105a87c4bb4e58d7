use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::ffi::OsString;
use std::path::PathBuf;

/// Name cargo passes as the first argument when run as `cargo sweeper`.
const CARGO_SUBCOMMAND: &str = "sweeper";

/// Cargo Sweeper - Clean build artifacts of every Rust project under a directory
#[derive(Parser, Debug)]
#[command(name = "cargo-sweeper", bin_name = "cargo-sweeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse process arguments, accepting both `cargo-sweeper ...` and
    /// `cargo sweeper ...`.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Drop the subcommand name cargo inserts after the binary name.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.get(1).is_some_and(|a| a == CARGO_SUBCOMMAND) {
        args.remove(1);
    }
    args
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover projects and clean their build artifacts
    Clean(CleanArgs),

    /// Report (and optionally remove) unused dependencies without cleaning
    Deps(DepsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Show what would be cleaned without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Paths to exclude (glob patterns, relative to the scan root)
    #[arg(short, long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Parallel clean jobs (0 = available parallelism)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Maximum recursion depth
    #[arg(short = 'd', long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Only clean projects whose artifacts are at least this large (e.g. 100MB)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Descend into hidden directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Also scan for unused dependencies
    #[arg(long)]
    pub check_deps: bool,

    /// Remove unused dependencies (implies --check-deps)
    #[arg(long)]
    pub remove_deps: bool,

    /// Skip `cargo clean` and delete artifact directories directly
    #[arg(long)]
    pub no_native: bool,

    /// Don't show a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Remove unused dependencies with `cargo remove`
    #[arg(long)]
    pub remove: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Paths to exclude (glob patterns, relative to the scan root)
    #[arg(short, long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Parallel scan jobs (0 = available parallelism)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}
