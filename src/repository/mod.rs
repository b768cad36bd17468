// src/repository/mod.rs

//! Repository mirrors and downloading
//!
//! This module provides:
//! - Mirror URL template expansion (`$repo`, `$arch`)
//! - The download handle shared by a sync run
//! - Ordered mirror fallback for files databases

mod client;
mod fetch;
mod url;

pub use client::{Fetcher, ProgressCallback, SyncHandle};
pub use fetch::{FILES_SUFFIX, download_repo_files, files_db_path};
pub use self::url::{ARCH_VAR, REPO_VAR, prepare_url};
