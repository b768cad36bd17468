// src/commands/repos.rs
//! Show configured repositories without downloading anything

use super::sync_options;
use crate::cli::GlobalArgs;
use anyhow::Result;
use filesdb::find_active_repos;
use filesdb::repository::{FILES_SUFFIX, files_db_path, prepare_url};

pub fn cmd_repos(global: &GlobalArgs) -> Result<()> {
    let repos = find_active_repos(&global.config)?;
    let options = sync_options(global);

    if repos.is_empty() {
        println!("No repositories configured in {}", global.config.display());
        return Ok(());
    }

    for repo in &repos {
        let cached = files_db_path(&options.cache_dir, &repo.name);
        let state = if cached.exists() { "cached" } else { "not synced" };
        println!("{} ({} mirror(s), {})", repo.name, repo.servers.len(), state);
        for server in &repo.servers {
            println!(
                "    {}",
                prepare_url(server, &repo.name, &options.arch, FILES_SUFFIX)
            );
        }
    }
    Ok(())
}
