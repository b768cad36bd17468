// src/commands/mod.rs
//! Command handlers for the filesdb CLI

mod repos;
mod sync;

pub use repos::cmd_repos;
pub use sync::cmd_sync;

use crate::cli::GlobalArgs;
use filesdb::sync::SyncOptions;

/// Build run options from the global command-line flags
pub(crate) fn sync_options(global: &GlobalArgs) -> SyncOptions {
    let defaults = SyncOptions::default();
    SyncOptions {
        root: global.root.clone(),
        db_path: global.dbpath.clone(),
        cache_dir: global.cachedir.clone(),
        arch: global.arch.clone().unwrap_or(defaults.arch),
        progress: !global.no_progress,
    }
}
