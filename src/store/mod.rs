//! On-disk index of the blog library.
//!
//! One JSON index file per blog at `<root>/Index/<name>.<tag>` plus a companion
//! sub-index at `<root>/Index/<name>_files.<tag>` listing what the crawl engine
//! already fetched. This module does plain file I/O and has no locking of its own.
//! Serializing writes for one name is the addition pipeline's job.

use crate::models::{Blog, BlogType, COMPANION_MARKER};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use thiserror::Error;

/// Errors raised by index file operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read index directory {path}: {source}")]
    ReadDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create index directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("an index file already exists at {path}")]
    AlreadyExists { path: Utf8PathBuf },

    #[error("failed to serialize blog {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A file the scan had to skip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: Utf8PathBuf,
    pub reason: String,
}

/// Outcome of scanning an index directory
#[derive(Debug, Default)]
pub struct LoadReport {
    pub blogs: Vec<Blog>,
    pub skipped: Vec<SkippedFile>,
}

/// Companion sub-index: the per-item record of fetched content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogFiles {
    pub name: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// Reads and writes blog index files
#[derive(Debug, Clone, Copy, Default)]
pub struct BlogStore;

impl BlogStore {
    pub fn new() -> Self {
        Self
    }

    /// Scan `directory` for index files and deserialize each into a [`Blog`].
    ///
    /// Only files whose extension is a known [`BlogType`] tag are considered,
    /// and companion sub-indexes are excluded. Unreadable or malformed files are
    /// logged and reported in [`LoadReport::skipped`]; they never abort the scan.
    /// The result is sorted by file name so load order is stable across platforms.
    pub fn load(&self, directory: &Utf8Path) -> Result<LoadReport, StoreError> {
        let entries = fs::read_dir(directory).map_err(|source| StoreError::ReadDir {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
            .filter(|path| is_index_file(path))
            .collect();
        candidates.sort();

        let mut report = LoadReport::default();
        for path in candidates {
            match read_blog(&path) {
                Ok(blog) => {
                    tracing::debug!("Loaded blog {} from {}", blog.name, path);
                    report.blogs.push(blog);
                }
                Err(reason) => {
                    tracing::warn!("Skipping unreadable index file {}: {}", path, reason);
                    report.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        tracing::info!(
            "Scanned {}: {} blogs loaded, {} files skipped",
            directory,
            report.blogs.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Write the blog's index file, and an empty companion if none exists yet.
    ///
    /// The index is written to a temporary file and renamed into place so a
    /// failed write never leaves a truncated index behind.
    pub fn persist(&self, blog: &Blog) -> Result<(), StoreError> {
        fs::create_dir_all(&blog.location).map_err(|source| StoreError::CreateDir {
            path: blog.location.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(blog).map_err(|source| StoreError::Serialize {
            name: blog.name.clone(),
            source,
        })?;
        write_atomic(&blog.index_path(), &json)?;

        let companion = blog.companion_path();
        if !companion.exists() {
            let files = BlogFiles {
                name: blog.name.clone(),
                links: Vec::new(),
            };
            let json =
                serde_json::to_string_pretty(&files).map_err(|source| StoreError::Serialize {
                    name: blog.name.clone(),
                    source,
                })?;
            write_atomic(&companion, &json)?;
        }

        tracing::debug!("Persisted index for {} at {}", blog.name, blog.index_path());
        Ok(())
    }

    /// Write the index of a blog that has never been stored.
    ///
    /// Refuses with [`StoreError::AlreadyExists`] when an index file for the
    /// name is already on disk, loaded or not. Callers serialize writes per name.
    pub fn persist_new(&self, blog: &Blog) -> Result<(), StoreError> {
        let path = blog.index_path();
        if path.exists() {
            return Err(StoreError::AlreadyExists { path });
        }
        self.persist(blog)
    }

    /// Remove the blog's index file and its companion sub-index.
    ///
    /// A file that is already gone counts as deleted.
    pub fn delete(&self, blog: &Blog) -> Result<(), StoreError> {
        remove_if_present(&blog.index_path())?;
        remove_if_present(&blog.companion_path())?;
        tracing::debug!("Deleted index files for {}", blog.name);
        Ok(())
    }
}

fn is_index_file(path: &Utf8Path) -> bool {
    let Some(file_name) = path.file_name() else {
        return false;
    };
    if file_name.contains(COMPANION_MARKER) {
        return false;
    }
    path.extension()
        .is_some_and(|ext| ext.parse::<BlogType>().is_ok())
        && path.is_file()
}

fn read_blog(path: &Utf8Path) -> Result<Blog, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents).map_err(|e| e.to_string())
}

fn write_atomic(path: &Utf8Path, contents: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
}

fn remove_if_present(path: &Utf8Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}
