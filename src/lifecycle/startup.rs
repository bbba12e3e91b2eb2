//! Startup orchestration.
//!
//! Builds the caching core from a validated config, in dependency order:
//! mirror root first, then the upstream client, then the engine. The caller
//! binds the listener afterwards.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::MirrorConfig;
use crate::mirror::{sweep_partials, CacheResolver, FetchEngine, Upstream, UpstreamInitError};

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("cannot prepare mirror root {path}: {source}")]
    MirrorRoot { path: PathBuf, source: io::Error },
    #[error("cannot build upstream client: {0}")]
    Upstream(#[from] UpstreamInitError),
}

/// Open the mirror root, sweep stale temp files, and wire the fetch engine.
pub async fn build_engine(config: &MirrorConfig) -> Result<FetchEngine, StartupError> {
    let root = PathBuf::from(&config.mirror.root);
    let resolver = CacheResolver::open(&root, config.mirror.index_document.clone())
        .await
        .map_err(|source| StartupError::MirrorRoot {
            path: root.clone(),
            source,
        })?;

    tracing::info!(root = %resolver.root().display(), "Mirror root ready");

    if config.mirror.sweep_partials_on_start {
        match sweep_partials(resolver.root()).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Removed partial downloads from a previous run"),
            Err(e) => tracing::warn!(error = %e, "Could not sweep partial downloads"),
        }
    }

    let upstream = Upstream::from_config(&config.upstream)?;
    tracing::info!(origin = %upstream.origin(), "Upstream client ready");

    Ok(FetchEngine::new(Arc::new(resolver), Arc::new(upstream)))
}
