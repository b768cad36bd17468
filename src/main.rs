// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Log level used when RUST_LOG is not set
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        None => commands::cmd_sync(&cli.global, &[])?,
        Some(Commands::Sync { repos }) => commands::cmd_sync(&cli.global, &repos)?,
        Some(Commands::Repos) => {
            commands::cmd_repos(&cli.global)?;
            0
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "filesdb",
                &mut std::io::stdout(),
            );
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
