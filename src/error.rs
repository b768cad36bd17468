// src/error.rs

//! Error types for filesdb

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while syncing and transcoding files databases
#[derive(Error, Debug)]
pub enum Error {
    /// Top-level configuration file could not be read
    #[error("failed to open {path}: {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An Include= target could not be read
    #[error("failed to read include {path}: {reason}")]
    Include { path: String, reason: String },

    /// A single mirror failed to deliver the archive
    #[error("download failed: {0}")]
    Download(String),

    /// Every configured mirror for a repository failed
    #[error("failed to download {repo}.files from any of {attempts} mirror(s)")]
    AllMirrorsFailed { repo: String, attempts: usize },

    /// Archive could not be opened or read
    #[error("failed to transcode {path}: {reason}")]
    Transcode { path: PathBuf, reason: String },

    /// Short or failed write into the new archive
    #[error("failed to write {bytes} bytes to {path}: {source}")]
    Write {
        bytes: usize,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Transcoded archive could not be moved over the original
    #[error("failed to rotate {from} into place at {to}: {source}")]
    Rotate {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Host environment is unusable (e.g. unwritable cache directory)
    #[error("{0}")]
    Environment(String),

    /// Runtime handle failed to initialize
    #[error("unable to initialize: {0}")]
    Init(String),

    /// Repository requested on the command line is not configured
    #[error("repository '{0}' is not configured")]
    UnknownRepository(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
