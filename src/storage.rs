//! Record storage backends
//!
//! The recorder never touches the filesystem directly. It asks a
//! [`RecordStore`] to do one of three things:
//!
//! | Operation                | Used by | Effect                                      |
//! |--------------------------|---------|---------------------------------------------|
//! | `create_unique`          | `start` | write a new record, last write wins         |
//! | `create_or_replace_alias`| `start` | point an alias at a record                  |
//! | `append_line`            | `end`   | append one line, following an alias if set  |
//!
//! # Concurrency
//!
//! Stores take no locks across processes. Two concurrent `start` calls for
//! the same name race on the alias and whichever replace lands last wins.
//! `FsStore` appends each line with a single `write` on an `O_APPEND` handle,
//! which local filesystems apply atomically for short lines; storage without
//! that guarantee may interleave partial lines.

use crate::error::{BtError, Result};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage collaborator for timing records
///
/// Names are bare record names (`bt.<key>.<timestamp>`, `bt.<key>`); the
/// store decides where they live.
pub trait RecordStore: Send + Sync {
    /// Create (or overwrite) the record `name` with `contents`
    fn create_unique(&self, name: &str, contents: &str) -> Result<()>;

    /// Make `alias` refer to the record `target`, replacing any previous alias
    fn create_or_replace_alias(&self, alias: &str, target: &str) -> Result<()>;

    /// Append `line` to `name`, creating it if absent
    ///
    /// If `name` is an alias, the line lands in the record it refers to.
    fn append_line(&self, name: &str, line: &str) -> Result<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn create_unique(&self, name: &str, contents: &str) -> Result<()> {
        (**self).create_unique(name, contents)
    }

    fn create_or_replace_alias(&self, alias: &str, target: &str) -> Result<()> {
        (**self).create_or_replace_alias(alias, target)
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        (**self).append_line(name, line)
    }
}

/// Records as files in one shared directory
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl RecordStore for FsStore {
    fn create_unique(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path_of(name);
        fs::write(&path, contents).map_err(|e| BtError::io(&path, e))
    }

    fn create_or_replace_alias(&self, alias: &str, target: &str) -> Result<()> {
        let alias_path = self.path_of(alias);
        // Build the new alias beside the old one, then rename over it so
        // readers never observe a missing alias.
        let staging = self.path_of(&format!("{target}.alias"));
        match fs::remove_file(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BtError::io(&staging, e)),
        }
        link_alias(target, &self.path_of(target), &staging)
            .map_err(|e| BtError::io(&staging, e))?;
        fs::rename(&staging, &alias_path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            BtError::io(&alias_path, e)
        })
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        let path = self.path_of(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BtError::io(&path, e))?;
        // The handle is closed when `file` drops, on success or failure
        file.write_all(line.as_bytes())
            .map_err(|e| BtError::io(&path, e))
    }
}

// Alias and record share a directory, so the link holds the bare name and
// resolves correctly for relative record directories too.
#[cfg(unix)]
fn link_alias(target_name: &str, _target_path: &Path, alias: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target_name, alias)
}

// Symbolic links need extra privileges on Windows; the alias becomes a copy
#[cfg(not(unix))]
fn link_alias(_target_name: &str, target_path: &Path, alias: &Path) -> std::io::Result<()> {
    fs::copy(target_path, alias).map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Record(String),
    Alias(String),
}

/// In-memory store with the alias-following semantics of `FsStore` on Unix
///
/// On other targets `FsStore` aliases are copies, so appends land in the copy
/// rather than in the start record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Entries are plain strings, a panic mid-update cannot break them
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Contents of `name`, following an alias
    pub fn read(&self, name: &str) -> Option<String> {
        let entries = self.lock();
        match entries.get(name)? {
            Entry::Record(contents) => Some(contents.clone()),
            Entry::Alias(target) => match entries.get(target)? {
                Entry::Record(contents) => Some(contents.clone()),
                Entry::Alias(_) => None,
            },
        }
    }

    /// Target of `name` if it is an alias
    pub fn alias_target(&self, name: &str) -> Option<String> {
        match self.lock().get(name)? {
            Entry::Alias(target) => Some(target.clone()),
            Entry::Record(_) => None,
        }
    }

    /// All names currently stored, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn create_unique(&self, name: &str, contents: &str) -> Result<()> {
        self.lock()
            .insert(name.to_string(), Entry::Record(contents.to_string()));
        Ok(())
    }

    fn create_or_replace_alias(&self, alias: &str, target: &str) -> Result<()> {
        self.lock()
            .insert(alias.to_string(), Entry::Alias(target.to_string()));
        Ok(())
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        let mut entries = self.lock();
        let destination = match entries.get(name) {
            Some(Entry::Alias(target)) => target.clone(),
            _ => name.to_string(),
        };
        match entries
            .entry(destination)
            .or_insert_with(|| Entry::Record(String::new()))
        {
            Entry::Record(contents) => {
                contents.push_str(line);
                Ok(())
            }
            // Only one level of alias is followed
            Entry::Alias(_) => Err(BtError::AliasChain {
                alias: name.to_string(),
            }),
        }
    }
}
