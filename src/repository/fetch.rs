// src/repository/fetch.rs

//! Mirror fallback for files database downloads

use crate::config::Repository;
use crate::error::{Error, Result};
use crate::sync::SyncContext;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::client::Fetcher;
use super::url::prepare_url;

/// Suffix of the files database served by each mirror
pub const FILES_SUFFIX: &str = ".files";

/// Canonical cache path of a repository's files database
pub fn files_db_path(cache_dir: &Path, repo: &str) -> PathBuf {
    cache_dir.join(format!("{repo}{FILES_SUFFIX}"))
}

/// Remove the cached files database so a failed download cannot leave it stale
fn unlink_files_db(cache_dir: &Path, repo: &str) {
    let path = files_db_path(cache_dir, repo);
    match fs::remove_file(&path) {
        Ok(()) => debug!("removed stale {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!("could not remove {}: {}", path.display(), e),
    }
}

/// Download `repo`'s files database from the first mirror that works
///
/// Mirrors are tried strictly in configured order; the first success ends
/// the search. Each failure is logged and the next mirror is tried. The
/// download always lands at [`files_db_path`], whose path is returned.
pub fn download_repo_files<F: Fetcher>(ctx: &SyncContext<F>, repo: &Repository) -> Result<PathBuf> {
    if !ctx.interactive {
        ctx.status(format_args!("downloading {}{}...", repo.name, FILES_SUFFIX));
    }

    let dest = files_db_path(&ctx.cache_dir, &repo.name);
    for server in &repo.servers {
        let url = prepare_url(server, &repo.name, &ctx.arch, FILES_SUFFIX);

        unlink_files_db(&ctx.cache_dir, &repo.name);

        match ctx.fetcher.fetch(&url, &dest) {
            Ok(_) => {
                if !ctx.interactive {
                    ctx.status(format_args!("\n"));
                }
                return Ok(dest);
            }
            Err(e) => {
                warn!("failed to download: {}", url);
                debug!("{}: {}", url, e);
            }
        }
    }

    if !ctx.interactive {
        ctx.status(format_args!("\n"));
    }

    Err(Error::AllMirrorsFailed {
        repo: repo.name.clone(),
        attempts: repo.servers.len(),
    })
}
