// src/archive/transcode.rs

//! Rewrite a downloaded files database as an uncompressed cpio archive
//!
//! The source may use any compression [`crate::compression`] recognizes.
//! Entries are copied one at a time in bounded chunks, so memory use does
//! not depend on the archive size. The new archive is written beside the
//! original as `<repo>.files~` and only renamed over it once complete.

use crate::compression::open_decoder;
use crate::error::{Error, Result};
use crate::repository::files_db_path;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use tar::EntryType;
use tracing::{debug, info};

use super::cpio::{
    CpioHeader, CpioWriter, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFREG,
};

/// Copy buffer size for entry data
const CHUNK_SIZE: usize = 8192;

/// Counters for a completed transcode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Removes the wrapped path on drop unless disarmed
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed && fs::remove_file(&self.path).is_ok() {
            debug!("removed incomplete {}", self.path.display());
        }
    }
}

/// Path of the in-progress archive for a given final path
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

fn transcode_err(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::Transcode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Narrow a tar id to the 32 bits cpio can hold
fn cpio_id(id: u64, what: &str, name: &str) -> u32 {
    u32::try_from(id).unwrap_or_else(|_| {
        debug!("{}: {} {} does not fit in cpio, clamping", name, what, id);
        u32::MAX
    })
}

/// Translate a tar entry's header into its cpio equivalent
///
/// Returns `None` for metadata-only entries (pax global headers and the
/// like) that describe the archive rather than a file in it.
fn cpio_header<R: Read>(entry: &tar::Entry<'_, R>, src: &Path) -> Result<Option<CpioHeader>> {
    let header = entry.header();

    match header.entry_type() {
        EntryType::XGlobalHeader
        | EntryType::XHeader
        | EntryType::GNULongName
        | EntryType::GNULongLink => {
            debug!(
                "{}: skipping {:?} entry {}",
                src.display(),
                header.entry_type(),
                String::from_utf8_lossy(&entry.path_bytes())
            );
            return Ok(None);
        }
        _ => {}
    }

    let name = String::from_utf8(entry.path_bytes().into_owned())
        .map_err(|_| transcode_err(src, "entry name is not valid UTF-8"))?;

    let perms = header.mode().map_err(|e| transcode_err(src, e))? & 0o7777;
    let uid = header.uid().map_err(|e| transcode_err(src, e))?;
    let gid = header.gid().map_err(|e| transcode_err(src, e))?;
    let mtime = header.mtime().map_err(|e| transcode_err(src, e))?;

    let mut cpio = CpioHeader {
        uid: cpio_id(uid, "uid", &name),
        gid: cpio_id(gid, "gid", &name),
        name,
        mtime,
        nlink: 1,
        ..Default::default()
    };

    let kind = match header.entry_type() {
        EntryType::Regular | EntryType::Continuous => {
            cpio.size = entry.size();
            S_IFREG
        }
        // The link is not preserved; the entry becomes an empty file
        EntryType::Link => S_IFREG,
        EntryType::Directory => {
            cpio.nlink = 2;
            S_IFDIR
        }
        EntryType::Symlink => {
            let target = entry
                .link_name_bytes()
                .ok_or_else(|| transcode_err(src, format!("symlink {} has no target", cpio.name)))?;
            cpio.size = target.len() as u64;
            S_IFLNK
        }
        EntryType::Char | EntryType::Block => {
            cpio.rdev_major = header
                .device_major()
                .map_err(|e| transcode_err(src, e))?
                .unwrap_or(0);
            cpio.rdev_minor = header
                .device_minor()
                .map_err(|e| transcode_err(src, e))?
                .unwrap_or(0);
            if header.entry_type() == EntryType::Char {
                S_IFCHR
            } else {
                S_IFBLK
            }
        }
        EntryType::Fifo => S_IFIFO,
        other => {
            return Err(transcode_err(
                src,
                format!("unsupported entry type {:?} for {}", other, cpio.name),
            ));
        }
    };
    cpio.mode = kind | perms;

    Ok(Some(cpio))
}

/// Transcode the archive at `src` into an uncompressed cpio archive at `dst`
///
/// `dst` is created (or truncated). On error it may hold a partial archive;
/// the caller owns its cleanup.
pub fn transcode(src: &Path, dst: &Path) -> Result<TranscodeStats> {
    let input = File::open(src)
        .map_err(|e| transcode_err(src, format!("failed to open file for reading: {e}")))?;
    let (format, decoder) =
        open_decoder(BufReader::new(input)).map_err(|e| transcode_err(src, e))?;
    debug!("{}: detected {} compression", src.display(), format);

    let output = File::create(dst)
        .map_err(|e| transcode_err(dst, format!("failed to open file for writing: {e}")))?;
    let mut writer = CpioWriter::new(BufWriter::new(output));

    let mut archive = tar::Archive::new(decoder);
    let entries = archive.entries().map_err(|e| transcode_err(src, e))?;

    let mut stats = TranscodeStats::default();
    let mut buf = [0u8; CHUNK_SIZE];

    for entry in entries {
        let mut entry = entry.map_err(|e| transcode_err(src, e))?;
        let Some(header) = cpio_header(&entry, src)? else {
            continue;
        };

        writer.write_header(&header).map_err(|e| {
            transcode_err(dst, format!("failed to write cpio header for {}: {e}", header.name))
        })?;

        if header.file_type() == S_IFLNK {
            // cpio stores the symlink target as the entry's data
            let target = entry.link_name_bytes().unwrap_or_default();
            writer.write_data(&target).map_err(|source| Error::Write {
                bytes: target.len(),
                path: dst.to_path_buf(),
                source,
            })?;
        } else if header.size > 0 {
            loop {
                let n = entry.read(&mut buf).map_err(|e| {
                    transcode_err(src, format!("failed to read {}: {e}", header.name))
                })?;
                if n == 0 {
                    break;
                }
                writer.write_data(&buf[..n]).map_err(|source| Error::Write {
                    bytes: n,
                    path: dst.to_path_buf(),
                    source,
                })?;
                stats.bytes += n as u64;
            }
        }
        stats.entries += 1;
    }

    let output = writer
        .finish()
        .map_err(|e| transcode_err(dst, format!("failed to finish archive: {e}")))?
        .into_inner()
        .map_err(|e| transcode_err(dst, e.error()))?;
    output.sync_all().map_err(|e| transcode_err(dst, e))?;

    Ok(stats)
}

/// Transcode the files database at `final_path` in place
///
/// The original is only replaced by a rename after the new archive is fully
/// written. On a transcode error the temporary is removed and the original
/// is left untouched. If the final rename fails the temporary is kept and
/// [`Error::Rotate`] is returned.
pub fn transcode_file(final_path: &Path) -> Result<TranscodeStats> {
    let tmp = temp_path(final_path);

    let guard = TempFileGuard::new(tmp.clone());
    let stats = transcode(final_path, &tmp)?;
    guard.disarm();

    fs::rename(&tmp, final_path).map_err(|source| Error::Rotate {
        from: tmp.clone(),
        to: final_path.to_path_buf(),
        source,
    })?;

    info!(
        "{}: rewrote {} entries ({} bytes) as cpio",
        final_path.display(),
        stats.entries,
        stats.bytes
    );
    Ok(stats)
}

/// Transcode `<cache_dir>/<repo>.files` in place
pub fn transcode_repo_file(cache_dir: &Path, repo: &str) -> Result<TranscodeStats> {
    transcode_file(&files_db_path(cache_dir, repo))
}
