//! Logical path normalization.
//!
//! A logical path is the slash-separated, root-relative identifier of a
//! mirrored resource. It is the only form of request path the resolver,
//! fetcher, and redirect builder accept, so every traversal check lives here.

use std::fmt;
use std::path::PathBuf;

use url::Url;

/// Why a raw request path was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is absolute")]
    Absolute,
    #[error("path contains a parent (`..`) segment")]
    ParentSegment,
    #[error("path begins with a drive letter")]
    DrivePrefix,
    #[error("path contains a NUL byte")]
    NulByte,
}

/// A validated, normalized path below the mirror root.
///
/// Invariants: no leading slash, no `.`/`..`/empty segments, no NUL bytes,
/// and no drive letter (`C:`) in front. A trailing slash is kept and marks a
/// directory-style path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    normalized: String,
}

impl LogicalPath {
    /// Normalize and validate a raw request path.
    ///
    /// Backslashes are treated as separators before any check runs.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let unified = raw.replace('\\', "/");

        if unified.contains('\0') {
            return Err(PathError::NulByte);
        }
        if unified.starts_with('/') {
            return Err(PathError::Absolute);
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(PathError::ParentSegment),
                s => {
                    if segments.is_empty() && has_drive_prefix(s) {
                        return Err(PathError::DrivePrefix);
                    }
                    segments.push(s);
                }
            }
        }

        let mut normalized = segments.join("/");
        if !normalized.is_empty() && unified.ends_with('/') {
            normalized.push('/');
        }
        Ok(Self { normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The same path with a trailing slash.
    pub fn as_directory(&self) -> Self {
        if self.is_directory() {
            return self.clone();
        }
        Self {
            normalized: format!("{}/", self.normalized),
        }
    }

    /// True for the empty path and for paths ending in `/`.
    pub fn is_directory(&self) -> bool {
        self.normalized.is_empty() || self.normalized.ends_with('/')
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.normalized.split('/').filter(|s| !s.is_empty())
    }

    /// Relative file path inside the mirror root.
    ///
    /// Directory-style paths map to their index document.
    pub fn local_relative(&self, index_document: &str) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        if self.is_directory() {
            path.push(index_document);
        }
        path
    }

    /// Percent-encoded form, without a leading slash.
    pub fn encoded(&self) -> String {
        let mut url = match Url::parse("http://localhost/") {
            Ok(url) => url,
            Err(_) => return self.normalized.clone(),
        };
        if let Ok(mut out) = url.path_segments_mut() {
            out.clear().extend(self.segments());
            if self.is_directory() && !self.normalized.is_empty() {
                out.push("");
            }
        }
        url.path().trim_start_matches('/').to_string()
    }
}

/// `C:`, `c:foo`: a segment Windows would read as a drive.
fn has_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}
