//! Cache resolution against the mirror root.
//!
//! # Design Decisions
//! - File existence is the only cache metadata
//! - Only regular files count as hits
//! - A file-style path naming a mirrored directory reports `Directory`, so the
//!   caller can redirect to the slashed form instead of fetching over it
//! - Read-only: safe to call alongside any number of in-flight fetches,
//!   because fetches only ever expose complete files (rename into place)

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::path::LogicalPath;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The entry exists; absolute path to the local file.
    Hit(PathBuf),
    /// A file-style path whose entry is a directory; holds the directory.
    Directory(PathBuf),
    Miss,
}

/// Maps logical paths onto the mirror directory and checks for cached entries.
#[derive(Debug, Clone)]
pub struct CacheResolver {
    root: PathBuf,
    index_document: String,
}

impl CacheResolver {
    /// Create the mirror root if needed and resolve it to an absolute path.
    pub async fn open(root: impl AsRef<Path>, index_document: impl Into<String>) -> io::Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let root = fs::canonicalize(root).await?;
        Ok(Self {
            root,
            index_document: index_document.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_document(&self) -> &str {
        &self.index_document
    }

    /// Where the entry for `path` lives (or would live).
    pub fn local_path(&self, path: &LogicalPath) -> PathBuf {
        self.root.join(path.local_relative(&self.index_document))
    }

    /// Look `path` up in the mirror.
    pub async fn resolve(&self, path: &LogicalPath) -> Resolution {
        let local = self.local_path(path);
        match fs::metadata(&local).await {
            Ok(meta) if meta.is_file() => Resolution::Hit(local),
            Ok(meta) if meta.is_dir() && !path.is_directory() => Resolution::Directory(local),
            _ => Resolution::Miss,
        }
    }
}
