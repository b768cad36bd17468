// src/config/mod.rs

//! pacman.conf-style repository configuration
//!
//! Reads a line-oriented INI file and resolves every non-`[options]` section
//! into a [`Repository`] carrying its mirror templates. `Server =` lines are
//! taken verbatim; `Include =` lines pull further `Server =` lines out of a
//! mirrorlist file (glob patterns allowed, as pacman does).
//!
//! ```text
//! [options]
//! Architecture = auto
//!
//! [core]
//! Server = https://mirror.example.org/$repo/os/$arch
//! Include = /etc/pacman.d/mirrorlist
//! ```

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reserved section holding global settings
const OPTIONS_SECTION: &str = "options";
const SERVER_KEY: &str = "Server";
const INCLUDE_KEY: &str = "Include";

/// A configured package repository and its mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    /// Mirror URL templates in declaration order (fetch priority)
    pub servers: Vec<String>,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            servers: Vec::new(),
        }
    }

    fn add_server(&mut self, server: &str) {
        self.servers.push(server.to_string());
    }
}

/// Drop everything from the first `#` and trim what is left
pub(crate) fn strip_comment(line: &str) -> &str {
    match line.split_once('#') {
        Some((content, _)) => content.trim(),
        None => line.trim(),
    }
}

/// Read the next raw line into `buf`, returning `false` at end of input
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    Ok(reader.read_until(b'\n', buf)? > 0)
}

/// Decode a raw line, dropping any comment before UTF-8 is checked
///
/// Comments may be in any encoding; what remains is decoded lossily.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let content = match raw.iter().position(|&b| b == b'#') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    String::from_utf8_lossy(content)
}

/// Split `key = value` at the first `=`, trimming both halves
pub(crate) fn split_key_value(line: &str) -> Option<(&str, &str)> {
    line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
}

/// Return the section name if `line` is a `[section]` header
fn section_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

/// Parse the configuration file at `path` into its active repositories
///
/// Failure to open `path` is fatal; failure to open an `Include` target is
/// logged and only skips that include.
pub fn find_active_repos(path: impl AsRef<Path>) -> Result<Vec<Repository>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })?;

    parse_repos(BufReader::new(file), &path.display().to_string())
}

/// Parse repositories from any buffered reader
///
/// `origin` only appears in log messages.
pub fn parse_repos<R: BufRead>(mut reader: R, origin: &str) -> Result<Vec<Repository>> {
    let mut repos: Vec<Repository> = Vec::new();
    // Index into `repos` of the section currently receiving keys
    let mut current: Option<usize> = None;
    let mut in_options = false;
    let mut raw = Vec::new();
    let mut lineno = 0;

    while next_line(&mut reader, &mut raw)? {
        lineno += 1;
        let line = decode_line(&raw);
        let line = strip_comment(&line);
        if line.is_empty() {
            continue;
        }

        if let Some(section) = section_name(line) {
            if section == OPTIONS_SECTION {
                in_options = true;
                current = None;
                continue;
            }
            in_options = false;

            if section.is_empty() {
                warn!("{}:{}: ignoring section with empty name", origin, lineno);
                current = None;
                continue;
            }

            current = match repos.iter().position(|r| r.name == section) {
                Some(idx) => {
                    debug!("{}:{}: reopening section [{}]", origin, lineno, section);
                    Some(idx)
                }
                None => {
                    repos.push(Repository::new(section));
                    Some(repos.len() - 1)
                }
            };
            continue;
        }

        if in_options {
            continue;
        }

        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        let Some(idx) = current else {
            warn!(
                "{}:{}: ignoring '{}' outside of a repository section",
                origin,
                lineno,
                key
            );
            continue;
        };
        let repo = &mut repos[idx];

        match key {
            SERVER_KEY => repo.add_server(value),
            INCLUDE_KEY => {
                if let Err(e) = add_servers_from_include(repo, value) {
                    warn!("{}", e);
                }
            }
            _ => {}
        }
    }

    debug!("found {} active repositories in {}", repos.len(), origin);
    Ok(repos)
}

/// Expand an `Include` value into the files it names
///
/// Plain paths pass through untouched so that a missing file surfaces as an
/// open error rather than an empty glob.
fn expand_include(pattern: &str) -> Result<Vec<PathBuf>> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let paths = glob::glob(pattern).map_err(|e| Error::Include {
        path: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut matches: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    matches.sort();

    if matches.is_empty() {
        return Err(Error::Include {
            path: pattern.to_string(),
            reason: "no files matched".to_string(),
        });
    }
    Ok(matches)
}

/// Append every `Server =` found in the include target(s) to `repo`
fn add_servers_from_include(repo: &mut Repository, pattern: &str) -> Result<()> {
    for path in expand_include(pattern)? {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("failed to open include {}: {}", path.display(), e);
                continue;
            }
        };

        let before = repo.servers.len();
        let mut reader = BufReader::new(file);
        let mut raw = Vec::new();
        while next_line(&mut reader, &mut raw).map_err(|e| Error::Include {
            path: path.display().to_string(),
            reason: e.to_string(),
        })? {
            let line = decode_line(&raw);
            let line = strip_comment(&line);
            if line.is_empty() {
                continue;
            }

            if let Some((SERVER_KEY, value)) = split_key_value(line) {
                repo.add_server(value);
            }
        }
        debug!(
            "[{}] {} server(s) from {}",
            repo.name,
            repo.servers.len() - before,
            path.display()
        );
    }

    Ok(())
}
