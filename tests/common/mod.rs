// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use filesdb::archive::{CpioHeader, CpioReader};
use filesdb::sync::SyncOptions;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entries of a small files database: (path, contents); `None` marks a directory
pub const FILES_DB: &[(&str, Option<&str>)] = &[
    ("bash-5.2.026-2", None),
    ("bash-5.2.026-2/desc", Some("%NAME%\nbash\n\n%VERSION%\n5.2.026-2\n")),
    ("bash-5.2.026-2/files", Some("%FILES%\netc/\netc/bash.bashrc\nusr/bin/bash\n")),
    ("glibc-2.39-1", None),
    ("glibc-2.39-1/desc", Some("%NAME%\nglibc\n")),
    ("glibc-2.39-1/files", Some("%FILES%\nusr/lib/libc.so.6\n")),
];

/// Build an uncompressed tar of [`FILES_DB`]
pub fn files_db_tar() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in FILES_DB {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(1_710_000_000);
        match content {
            Some(data) => {
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                builder
                    .append_data(&mut header, path, data.as_bytes())
                    .unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn zstd(data: &[u8]) -> Vec<u8> {
    zstd::encode_all(data, 3).unwrap()
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn lz4(data: &[u8]) -> Vec<u8> {
    let mut enc = lz4_flex::frame::FrameEncoder::new(Vec::new());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// A scratch environment: mirrors, a cache directory and a db path
pub struct Env {
    pub dir: TempDir,
}

impl Env {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cache")).unwrap();
        fs::create_dir_all(dir.path().join("db")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path().join("cache")
    }

    /// `file://` template for a mirror directory (which may not exist)
    pub fn mirror_template(&self, mirror: &str) -> String {
        format!("file://{}/{}/$repo/os/$arch", self.path().display(), mirror)
    }

    /// Publish `data` as `<repo>.files` on `mirror` for x86_64
    pub fn publish(&self, mirror: &str, repo: &str, data: &[u8]) {
        let dir = self.path().join(mirror).join(repo).join("os").join("x86_64");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{repo}.files")), data).unwrap();
    }

    pub fn write_config(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            root: PathBuf::from("/"),
            db_path: self.path().join("db"),
            cache_dir: self.cache_dir(),
            arch: "x86_64".to_string(),
            progress: false,
        }
    }
}

/// Read every entry of a cpio archive on disk
pub fn read_cpio(path: &Path) -> Vec<(CpioHeader, Vec<u8>)> {
    let data = fs::read(path).unwrap();
    let mut reader = CpioReader::new(data.as_slice());
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().unwrap() {
        entries.push(entry);
    }
    entries
}

/// Assert that `path` holds [`FILES_DB`] as cpio, entry for entry
pub fn assert_files_db_cpio(path: &Path) {
    let entries = read_cpio(path);
    assert_eq!(entries.len(), FILES_DB.len());

    for ((header, data), (name, content)) in entries.iter().zip(FILES_DB) {
        assert_eq!(header.name, *name);
        assert_eq!(header.mtime, 1_710_000_000);
        match content {
            Some(expected) => {
                assert_eq!(header.file_type(), filesdb::archive::cpio::S_IFREG);
                assert_eq!(header.mode & 0o7777, 0o644);
                assert_eq!(data.as_slice(), expected.as_bytes());
            }
            None => {
                assert_eq!(header.file_type(), filesdb::archive::cpio::S_IFDIR);
                assert!(data.is_empty());
            }
        }
    }
}
