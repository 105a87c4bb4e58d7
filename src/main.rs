use std::process::ExitCode;

use clap::CommandFactory;

use cargo_sweeper::cli::{Cli, Command};
use cargo_sweeper::commands;
use cargo_sweeper::config::Config;

/// Exit status for setup errors (bad config, unreadable root, ambiguous roots).
const SETUP_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(SETUP_ERROR)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    tracing::debug!(?config, "Loaded configuration");

    // Dispatch to subcommand
    match cli.command {
        Command::Clean(args) => {
            tracing::info!(?args, "Starting clean");
            commands::clean::run(args, &config, cli.quiet)
        }
        Command::Deps(args) => {
            tracing::info!(?args, "Starting dependency scan");
            commands::deps::run(args, &config, cli.quiet)
        }
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
    }
}

fn init_logging(verbosity: u8, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cargo_sweeper={}", level)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
