// src/archive/mod.rs

//! Archive container handling
//!
//! - `cpio`: newc reader and writer
//! - `transcode`: tar (any compression) to uncompressed cpio, with atomic
//!   replacement of the cached file

pub mod cpio;
mod transcode;

pub use cpio::{CpioHeader, CpioReader, CpioWriter};
pub use transcode::{TranscodeStats, temp_path, transcode, transcode_file, transcode_repo_file};
