// src/cli.rs
//! CLI definitions for filesdb
//!
//! The command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use filesdb::sync::{DEFAULT_CACHE_DIR, DEFAULT_DB_PATH, DEFAULT_ROOT};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filesdb")]
#[command(author = "Conary Contributors")]
#[command(version)]
#[command(about = "Sync pacman files databases and rewrite them as uncompressed cpio", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the pacman configuration file
    #[arg(short, long, default_value = "/etc/pacman.conf", global = true)]
    pub config: PathBuf,

    /// Directory holding the synced files databases
    #[arg(long, default_value = DEFAULT_CACHE_DIR, global = true)]
    pub cachedir: PathBuf,

    /// pacman database directory
    #[arg(short = 'b', long, default_value = DEFAULT_DB_PATH, global = true)]
    pub dbpath: PathBuf,

    /// Filesystem root
    #[arg(short, long, default_value = DEFAULT_ROOT, global = true)]
    pub root: PathBuf,

    /// Architecture substituted for $arch (default: this machine's)
    #[arg(long, global = true)]
    pub arch: Option<String>,

    /// Never draw progress bars, even on a terminal
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and transcode files databases (default)
    Sync {
        /// Only sync these repositories (repeatable)
        #[arg(long = "repo", value_name = "NAME")]
        repos: Vec<String>,
    },

    /// Show configured repositories and the URLs that would be fetched
    Repos,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
