// src/sync.rs

//! Run driver: fetch and transcode every configured repository
//!
//! A run owns one [`SyncContext`], created up front and dropped at the end,
//! so the download handle is initialized and released exactly once.
//! Repositories are processed strictly in order and a failure in one never
//! stops the rest.

use crate::archive::{TranscodeStats, transcode_file};
use crate::config::Repository;
use crate::error::{Error, Result};
use crate::progress::TransferProgress;
use crate::repository::{Fetcher, SyncHandle, download_repo_files};
use nix::unistd::{AccessFlags, access};
use std::cell::RefCell;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Default cache directory for transcoded files databases
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/filesdb";
/// Default pacman database directory handed to the handle
pub const DEFAULT_DB_PATH: &str = "/var/lib/pacman/";
/// Default filesystem root
pub const DEFAULT_ROOT: &str = "/";

/// Settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub cache_dir: PathBuf,
    /// Value substituted for `$arch` in mirror templates
    pub arch: String,
    /// Allow progress bars when stdout is a terminal
    pub progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            arch: std::env::consts::ARCH.to_string(),
            progress: true,
        }
    }
}

/// State shared by every repository in a run
pub struct SyncContext<F: Fetcher = SyncHandle> {
    pub fetcher: F,
    pub cache_dir: PathBuf,
    pub arch: String,
    /// stdout is a live terminal and progress bars are shown
    pub interactive: bool,
    /// Where plain status lines go when not interactive
    status: RefCell<Box<dyn Write>>,
}

impl<F: Fetcher> SyncContext<F> {
    pub fn new(
        fetcher: F,
        cache_dir: impl Into<PathBuf>,
        arch: impl Into<String>,
        interactive: bool,
    ) -> Self {
        Self {
            fetcher,
            cache_dir: cache_dir.into(),
            arch: arch.into(),
            interactive,
            status: RefCell::new(Box::new(io::stdout())),
        }
    }

    /// Send status lines to `writer` instead of stdout
    pub fn with_status_writer(self, writer: impl Write + 'static) -> Self {
        Self {
            status: RefCell::new(Box::new(writer)),
            ..self
        }
    }

    /// Write a status fragment and flush it so partial lines show up
    pub(crate) fn status(&self, args: fmt::Arguments<'_>) {
        let mut out = self.status.borrow_mut();
        if let Err(e) = out.write_fmt(args).and_then(|()| out.flush()) {
            debug!("failed to write status: {}", e);
        }
    }
}

/// Result of syncing a single repository
#[derive(Debug)]
pub struct RepoOutcome {
    pub name: String,
    pub result: Result<TranscodeStats>,
}

impl RepoOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-repository results of a run, in processing order
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub outcomes: Vec<RepoOutcome>,
}

impl SyncSummary {
    pub fn failed(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Process exit status: 0 when every repository synced
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() { 0 } else { 1 }
    }
}

/// Fail unless the current user can write into `cache_dir`
pub fn check_cache_writable(cache_dir: &Path) -> Result<()> {
    access(cache_dir, AccessFlags::W_OK).map_err(|errno| {
        Error::Environment(format!(
            "unable to write to {}: {}",
            cache_dir.display(),
            errno.desc()
        ))
    })
}

/// Fetch then transcode one repository
pub fn sync_repo<F: Fetcher>(ctx: &SyncContext<F>, repo: &Repository) -> Result<TranscodeStats> {
    let path = download_repo_files(ctx, repo)?;
    transcode_file(&path)
}

/// Sync every repository with an already-built context
pub fn sync_repos<F: Fetcher>(ctx: &SyncContext<F>, repos: &[Repository]) -> SyncSummary {
    let mut summary = SyncSummary::default();

    for repo in repos {
        let result = sync_repo(ctx, repo);
        if let Err(e) = &result {
            error!("{}: {}", repo.name, e);
        }
        summary.outcomes.push(RepoOutcome {
            name: repo.name.clone(),
            result,
        });
    }

    summary
}

/// Run a complete sync
///
/// Environment problems (unwritable cache directory, handle initialization)
/// abort before any repository is touched. Everything else is reported per
/// repository in the returned summary.
pub fn run(options: &SyncOptions, repos: &[Repository]) -> Result<SyncSummary> {
    let interactive = options.progress && std::io::stdout().is_terminal();

    check_cache_writable(&options.cache_dir)?;

    let mut handle = SyncHandle::initialize(&options.root, &options.db_path)?;
    handle.set_cache_dir(&options.cache_dir);
    if interactive {
        let progress = TransferProgress::new();
        handle.set_progress_callback(move |file, xfer, total| progress.update(file, xfer, total));
    }

    let ctx = SyncContext::new(handle, &options.cache_dir, &options.arch, interactive);

    info!(
        "syncing {} repositories into {}",
        repos.len(),
        options.cache_dir.display()
    );
    let summary = sync_repos(&ctx, repos);
    drop(ctx);

    Ok(summary)
}
