// src/repository/client.rs

//! Download handle for repository mirrors
//!
//! [`SyncHandle`] owns the HTTP client, the cache directory and the optional
//! progress callback for a whole sync run. Everything that downloads goes
//! through the [`Fetcher`] trait so the mirror fallback logic can be driven
//! by other transports in tests.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Progress callback: `(filename, bytes_transferred, bytes_total)`
///
/// `bytes_total` is 0 when the server does not announce a length.
pub type ProgressCallback = Box<dyn Fn(&str, u64, u64)>;

/// Something that can retrieve a URL into the local cache
pub trait Fetcher {
    /// Download `url` to `dest`, returning the number of bytes written
    ///
    /// `dest` is only created once the transfer is complete.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Process-wide download handle
pub struct SyncHandle {
    root: PathBuf,
    db_path: PathBuf,
    cache_dir: Option<PathBuf>,
    client: Client,
    progress: Option<ProgressCallback>,
}

impl SyncHandle {
    /// Create a handle rooted at `root`, using `db_path` as the database directory
    pub fn initialize(root: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let db_path = db_path.as_ref();

        if !root.is_absolute() || !db_path.is_absolute() {
            return Err(Error::Init(format!(
                "root ({}) and database path ({}) must be absolute",
                root.display(),
                db_path.display()
            )));
        }
        if !root.is_dir() {
            return Err(Error::Init(format!(
                "root {} is not a directory",
                root.display()
            )));
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("filesdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Init(format!("failed to create HTTP client: {e}")))?;

        debug!(
            "initialized handle (root: {}, dbpath: {})",
            root.display(),
            db_path.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            db_path: db_path.to_path_buf(),
            cache_dir: None,
            client,
            progress: None,
        })
    }

    /// Set the directory downloads are written to
    pub fn set_cache_dir(&mut self, path: impl Into<PathBuf>) {
        self.cache_dir = Some(path.into());
    }

    pub fn cache_dir(&self) -> Result<&Path> {
        self.cache_dir
            .as_deref()
            .ok_or_else(|| Error::Init("cache directory not set".to_string()))
    }

    /// Register a callback invoked as bytes arrive
    pub fn set_progress_callback(&mut self, callback: impl Fn(&str, u64, u64) + 'static) {
        self.progress = Some(Box::new(callback));
    }

    fn report(&self, filename: &str, xfer: u64, total: u64) {
        if let Some(cb) = &self.progress {
            cb(filename, xfer, total);
        }
    }

    /// Copy `reader` into `dest` through a `.part` file, reporting progress
    fn stream_to_file(
        &self,
        mut reader: impl Read,
        dest: &Path,
        filename: &str,
        total: u64,
    ) -> Result<u64> {
        let part = partial_path(dest);
        let result = (|| -> Result<u64> {
            let mut file = File::create(&part).map_err(|e| {
                Error::Download(format!("failed to create {}: {e}", part.display()))
            })?;

            let mut downloaded: u64 = 0;
            let mut buffer = [0u8; STREAM_BUFFER_SIZE];
            self.report(filename, 0, total);

            loop {
                let bytes_read = reader
                    .read(&mut buffer)
                    .map_err(|e| Error::Download(format!("failed to read response: {e}")))?;
                if bytes_read == 0 {
                    break;
                }

                file.write_all(&buffer[..bytes_read]).map_err(|e| {
                    Error::Download(format!("failed to write {}: {e}", part.display()))
                })?;

                downloaded += bytes_read as u64;
                self.report(filename, downloaded, total);
            }

            file.sync_all()?;
            fs::rename(&part, dest).map_err(|e| {
                Error::Download(format!(
                    "failed to move {} to {}: {e}",
                    part.display(),
                    dest.display()
                ))
            })?;
            Ok(downloaded)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&part);
        }
        result
    }

    fn fetch_http(&self, url: &Url, dest: &Path, filename: &str) -> Result<u64> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| Error::Download(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let total = response.content_length().unwrap_or(0);
        self.stream_to_file(response, dest, filename, total)
    }

    fn fetch_local(&self, url: &Url, dest: &Path, filename: &str) -> Result<u64> {
        let src = url
            .to_file_path()
            .map_err(|_| Error::Download(format!("invalid file URL: {url}")))?;
        let file = File::open(&src)
            .map_err(|e| Error::Download(format!("failed to open {}: {e}", src.display())))?;
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.stream_to_file(file, dest, filename, total)
    }
}

impl Fetcher for SyncHandle {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let cache_dir = self.cache_dir()?;
        if !dest.starts_with(cache_dir) {
            return Err(Error::Download(format!(
                "{} is outside the cache directory {}",
                dest.display(),
                cache_dir.display()
            )));
        }

        let parsed =
            Url::parse(url).map_err(|e| Error::Download(format!("invalid URL {url}: {e}")))?;
        let filename = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Download(format!("no file name in {}", dest.display())))?;

        let bytes = match parsed.scheme() {
            "http" | "https" => self.fetch_http(&parsed, dest, &filename)?,
            "file" => self.fetch_local(&parsed, dest, &filename)?,
            other => {
                return Err(Error::Download(format!(
                    "unsupported URL scheme '{other}' in {url}"
                )));
            }
        };

        info!("downloaded {} ({} bytes) from {}", filename, bytes, url);
        Ok(bytes)
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        debug!(
            "released handle (root: {}, dbpath: {})",
            self.root.display(),
            self.db_path.display()
        );
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn handle_in(dir: &TempDir) -> SyncHandle {
        let mut handle = SyncHandle::initialize("/", dir.path().join("db")).unwrap();
        handle.set_cache_dir(dir.path());
        handle
    }

    #[test]
    fn test_initialize_rejects_relative_paths() {
        assert!(matches!(
            SyncHandle::initialize("relative", "/var/lib/pacman"),
            Err(Error::Init(_))
        ));
        assert!(matches!(
            SyncHandle::initialize("/", "var/lib/pacman"),
            Err(Error::Init(_))
        ));
    }

    #[test]
    fn test_fetch_requires_cache_dir() {
        let handle = SyncHandle::initialize("/", "/var/lib/pacman").unwrap();
        assert!(matches!(
            handle.fetch("file:///nonexistent/core.files", Path::new("/tmp/core.files")),
            Err(Error::Init(_))
        ));
    }

    #[test]
    fn test_fetch_rejects_dest_outside_cache() {
        let cache = TempDir::new().unwrap();
        let handle = handle_in(&cache);
        assert!(matches!(
            handle.fetch("file:///nonexistent/core.files", Path::new("/tmp/core.files")),
            Err(Error::Download(_))
        ));
    }

    #[test]
    fn test_fetch_writes_to_given_dest() {
        let src_dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let src = src_dir.path().join("my repo.files");
        fs::write(&src, b"data").unwrap();

        let handle = handle_in(&cache);
        let url = Url::from_file_path(&src).unwrap();
        assert!(url.as_str().ends_with("my%20repo.files"));

        let dest = cache.path().join("my repo.files");
        assert_eq!(handle.fetch(url.as_str(), &dest).unwrap(), 4);

        let names: Vec<_> = fs::read_dir(cache.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["my repo.files"]);
    }

    #[test]
    fn test_fetch_file_url_with_progress() {
        let src_dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let src = src_dir.path().join("core.files");
        fs::write(&src, vec![7u8; 20_000]).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut handle = handle_in(&cache);
        handle.set_progress_callback(move |name, xfer, total| {
            sink.borrow_mut().push((name.to_string(), xfer, total));
        });

        let url = Url::from_file_path(&src).unwrap();
        let path = cache.path().join("core.files");
        assert_eq!(handle.fetch(url.as_str(), &path).unwrap(), 20_000);

        assert_eq!(fs::read(&path).unwrap().len(), 20_000);
        assert!(!partial_path(&path).exists());

        let events = events.borrow();
        assert_eq!(events.first(), Some(&("core.files".to_string(), 0, 20_000)));
        assert_eq!(events.last(), Some(&("core.files".to_string(), 20_000, 20_000)));
    }

    #[test]
    fn test_fetch_missing_file_leaves_no_partial() {
        let cache = TempDir::new().unwrap();
        let handle = handle_in(&cache);

        let err = handle
            .fetch(
                "file:///nonexistent/filesdb/core.files",
                &cache.path().join("core.files"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Download(_)));
        assert!(!cache.path().join("core.files").exists());
        assert!(!cache.path().join("core.files.part").exists());
    }

    #[test]
    fn test_unsupported_scheme() {
        let cache = TempDir::new().unwrap();
        let handle = handle_in(&cache);
        assert!(matches!(
            handle.fetch("ftp://mirror.example/core.files", &cache.path().join("core.files")),
            Err(Error::Download(_))
        ));
    }
}
