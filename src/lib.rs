// src/lib.rs

//! filesdb
//!
//! Keeps local copies of pacman "files" databases current. Repositories and
//! their mirrors come from a pacman.conf-style file; each repository's
//! `<repo>.files` archive is fetched from the first mirror that answers and
//! rewritten as an uncompressed cpio archive, which downstream tools can
//! scan sequentially without paying for decompression.
//!
//! # Architecture
//!
//! - `config`: pacman.conf parsing (`Server`, `Include`)
//! - `repository`: `$repo`/`$arch` expansion, download handle, mirror fallback
//! - `archive`: tar to cpio transcoding with atomic replacement
//! - `sync`: the per-run driver tying the above together

pub mod archive;
pub mod compression;
pub mod config;
mod error;
pub mod progress;
pub mod repository;
pub mod sync;

pub use config::{Repository, find_active_repos};
pub use error::{Error, Result};
pub use sync::{SyncContext, SyncOptions, SyncSummary};
