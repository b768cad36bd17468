// src/commands/sync.rs
//! Sync command

use super::sync_options;
use crate::cli::GlobalArgs;
use anyhow::Result;
use filesdb::{Error, Repository, find_active_repos};
use tracing::info;

/// Keep only the repositories named in `wanted`, in configuration order
fn select_repos(repos: Vec<Repository>, wanted: &[String]) -> filesdb::Result<Vec<Repository>> {
    if wanted.is_empty() {
        return Ok(repos);
    }

    if let Some(missing) = wanted.iter().find(|w| !repos.iter().any(|r| &r.name == *w)) {
        return Err(Error::UnknownRepository(missing.clone()));
    }

    Ok(repos
        .into_iter()
        .filter(|r| wanted.contains(&r.name))
        .collect())
}

/// Sync files databases, returning the process exit code
pub fn cmd_sync(global: &GlobalArgs, wanted: &[String]) -> Result<i32> {
    let repos = select_repos(find_active_repos(&global.config)?, wanted)?;

    if repos.is_empty() {
        println!("No repositories configured in {}", global.config.display());
        return Ok(0);
    }

    let options = sync_options(global);
    let summary = filesdb::sync::run(&options, &repos)?;

    let failed: Vec<_> = summary.failed().map(|o| o.name.as_str()).collect();
    if failed.is_empty() {
        info!("synced {} repositories", summary.outcomes.len());
    } else {
        eprintln!(
            "error: {} of {} repositories failed to sync: {}",
            failed.len(),
            summary.outcomes.len(),
            failed.join(", ")
        );
    }

    Ok(summary.exit_code())
}
