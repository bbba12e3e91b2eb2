//! Fetch-and-persist engine.
//!
//! # Data Flow
//! ```text
//! fetch_and_persist(path)
//!     → resolver hit? return it (no network)
//!     → mirrored directory? continue with `path/` (its index document)
//!     → FlightMap::join (one download per path)
//!         → GET origin/path
//!         → 404 → NotFound, other non-2xx → UpstreamStatus
//!         → mkdir -p parent
//!         → stream body → .fetch-<uuid>.part → fsync → rename
//!     → local path
//! ```
//!
//! # Design Decisions
//! - The final path only ever appears through `rename`, so a cache entry is
//!   complete by construction
//! - Any failure after the temp file is created removes it
//! - Downloads run detached from the request; a disconnect never truncates them

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reqwest::{Response, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::error::FetchError;
use super::flight::{FetchResult, FlightMap};
use super::path::LogicalPath;
use super::resolver::{CacheResolver, Resolution};
use super::upstream::Upstream;
use crate::observability::metrics;

const PARTIAL_PREFIX: &str = ".fetch-";
const PARTIAL_SUFFIX: &str = ".part";

/// Downloads missing resources into the mirror, one flight per path.
#[derive(Clone)]
pub struct FetchEngine {
    resolver: Arc<CacheResolver>,
    upstream: Arc<Upstream>,
    flights: FlightMap,
}

impl FetchEngine {
    pub fn new(resolver: Arc<CacheResolver>, upstream: Arc<Upstream>) -> Self {
        Self {
            resolver,
            upstream,
            flights: FlightMap::new(),
        }
    }

    pub fn resolver(&self) -> &CacheResolver {
        &self.resolver
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Make `path` available in the mirror and return its local file.
    ///
    /// A path naming a mirrored directory stands for that directory's index.
    pub async fn fetch_and_persist(&self, path: &LogicalPath) -> FetchResult {
        let path = match self.resolver.resolve(path).await {
            Resolution::Hit(local) => return Ok(local),
            Resolution::Directory(_) => path.as_directory(),
            Resolution::Miss => path.clone(),
        };

        let engine = self.clone();
        let owned = path.clone();
        let landing = self
            .flights
            .join(&path, move || async move { engine.download(&owned).await })
            .await;

        if landing.coalesced {
            metrics::record_coalesced();
        }
        landing.result
    }

    async fn download(&self, path: &LogicalPath) -> FetchResult {
        let url = self.upstream.url_for(path);

        // A flight for this path may have landed between our miss and our turn.
        if let Resolution::Hit(local) = self.resolver.resolve(path).await {
            return Ok(local);
        }

        let started = Instant::now();
        let target = self.resolver.local_path(path);
        let result = self.download_to(path, &target).await;

        match &result {
            Ok(bytes) => {
                tracing::info!(
                    path = %path,
                    url = %url,
                    bytes = *bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cached upstream resource"
                );
                metrics::record_fetch("stored", *bytes, started);
            }
            Err(FetchError::NotFound) => {
                tracing::info!(path = %path, url = %url, "Upstream has no such resource");
                metrics::record_fetch(FetchError::NotFound.kind(), 0, started);
            }
            Err(e) => {
                tracing::warn!(path = %path, url = %url, error = %e, "Upstream fetch failed");
                metrics::record_fetch(e.kind(), 0, started);
            }
        }

        result.map(|_| target)
    }

    async fn download_to(&self, path: &LogicalPath, target: &Path) -> Result<u64, FetchError> {
        let mut response = self.upstream.get(path).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(target);
        let written = match stream_to_file(&mut response, &partial).await {
            Ok(n) => n,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, target).await {
            discard(&partial).await;
            return Err(e.into());
        }
        Ok(written)
    }
}

/// Copy the body chunk by chunk; memory stays bounded by one chunk.
async fn stream_to_file(response: &mut Response, partial: &Path) -> Result<u64, FetchError> {
    let expected = response.content_length();
    let mut file = File::create(partial).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    if let Some(expected) = expected {
        if expected != written {
            return Err(FetchError::Incomplete {
                expected,
                received: written,
            });
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
        }
    }
}

/// Sibling temp file, so the final `rename` never crosses filesystems.
fn partial_path(target: &Path) -> PathBuf {
    let name = format!("{}{}{}", PARTIAL_PREFIX, Uuid::new_v4(), PARTIAL_SUFFIX);
    match target.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn is_partial(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

/// Remove temp files left behind by a previous process. Returns how many.
///
/// Must run before the server accepts traffic: live fetches use the same names.
pub async fn sweep_partials(root: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() && entry.file_name().to_str().is_some_and(is_partial) {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
    }

    Ok(removed)
}
