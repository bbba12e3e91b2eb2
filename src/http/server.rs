//! HTTP server setup and request handlers.
//!
//! # Responsibilities
//! - Create Axum Router with the three mirror routes
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener, stop on shutdown signal
//! - Run the resolve → fetch → respond pipeline per request
//!
//! # Routes
//! ```text
//! GET /                      → index document, no caching logic
//! GET <prefix>/{*path}       → hit: serve; miss: fetch, then serve
//! GET /{*path}               → hit or fetch: 307 to <prefix>/{path}
//! ```
//! On either route, a slashless path naming a mirrored directory answers
//! 307 to `<prefix>/{path}/` without touching the network.
//! `get` also answers HEAD.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::MirrorConfig;
use crate::http::request::{self, propagate_request_id, set_request_id};
use crate::http::response::{self, CacheStatus, RequestOrigin};
use crate::mirror::{FetchEngine, FetchError, LogicalPath, Resolution};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: FetchEngine,
    pub static_prefix: Arc<str>,
}

/// HTTP server for the mirror.
pub struct HttpServer {
    router: Router,
    config: MirrorConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `engine`'s mirror.
    pub fn new(config: MirrorConfig, engine: FetchEngine) -> Self {
        let state = AppState {
            engine,
            static_prefix: Arc::from(config.mirror.static_prefix.as_str()),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MirrorConfig, state: AppState) -> Router {
        let prefix = config.mirror.static_prefix.as_str();
        let prefix_root = format!("{}/", prefix);
        let to_prefix_root = prefix_root.clone();

        Router::new()
            .route("/", get(index_handler))
            .route(
                prefix,
                get(move || std::future::ready(Redirect::temporary(&to_prefix_root))),
            )
            .route(&prefix_root, get(static_root_handler))
            .route(&format!("{}/{{*path}}", prefix), get(static_handler))
            .route("/{*path}", get(catch_all_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id())
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.upstream.origin,
            static_prefix = %self.config.mirror.static_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }
}

/// `GET /`: the index document straight from the mirror root.
async fn index_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let resolver = state.engine.resolver();
    let index = resolver.root().join(resolver.index_document());
    response::serve_file(&index, None, request).await
}

/// `GET <prefix>/`: the mirrored site's root document.
async fn static_root_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    mirror_request(state, String::new(), RequestOrigin::AssetSubpath, request).await
}

/// `GET <prefix>/{*path}`.
async fn static_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    mirror_request(state, path, RequestOrigin::AssetSubpath, request).await
}

/// `GET /{*path}`.
async fn catch_all_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    mirror_request(state, path, RequestOrigin::CatchAll, request).await
}

/// Resolve, fetch on miss, then shape the response for `origin`.
async fn mirror_request(
    state: AppState,
    raw_path: String,
    origin: RequestOrigin,
    request: Request<Body>,
) -> Response {
    let request_id = request::request_id(&request).to_owned();

    let path = match LogicalPath::parse(&raw_path) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                raw_path = %raw_path,
                error = %e,
                "Rejected request path"
            );
            return FetchError::from(e).into_response();
        }
    };

    let (local, cache) = match state.engine.resolver().resolve(&path).await {
        Resolution::Hit(local) => {
            metrics::record_lookup(true);
            (local, CacheStatus::Hit)
        }
        Resolution::Directory(_) => {
            metrics::record_lookup(true);
            return response::redirect_to_static(
                &state.static_prefix,
                &path.as_directory(),
                CacheStatus::Hit,
            );
        }
        Resolution::Miss => {
            metrics::record_lookup(false);
            tracing::debug!(request_id = %request_id, path = %path, "Cache miss, fetching upstream");
            match state.engine.fetch_and_persist(&path).await {
                Ok(local) => (local, CacheStatus::Miss),
                Err(e) => return response::fetch_failed(&path, e),
            }
        }
    };

    response::available(origin, &state.static_prefix, &path, &local, cache, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use tower::ServiceExt;
    use url::Url;

    use crate::http::response::X_MIRROR_CACHE;
    use crate::mirror::{CacheResolver, Upstream};

    async fn server_for(root: &std::path::Path) -> HttpServer {
        let config = MirrorConfig::default();
        let resolver = CacheResolver::open(root, &config.mirror.index_document)
            .await
            .unwrap();
        // Nothing listens here; any upstream access turns into a 500.
        let origin = Url::parse("http://127.0.0.1:9/").unwrap();
        let upstream = Upstream::new(reqwest::Client::new(), origin);
        let engine = FetchEngine::new(Arc::new(resolver), Arc::new(upstream));
        HttpServer::new(config, engine)
    }

    async fn get(server: &HttpServer, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        server.router().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_bare_prefix_redirects_to_prefix_root() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_for(dir.path()).await;
        assert_eq!(server.config().mirror.static_prefix, "/static");

        let response = get(&server, "/static").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/static/");
    }

    #[tokio::test]
    async fn test_mirrored_directory_redirects_to_slashed_form() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("levels")).unwrap();
        std::fs::write(dir.path().join("levels/index.html"), b"<html>levels</html>").unwrap();
        let server = server_for(dir.path()).await;

        for uri in ["/static/levels", "/levels"] {
            let response = get(&server, uri).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/static/levels/", "{uri}");
            assert_eq!(response.headers()[X_MIRROR_CACHE], "hit", "{uri}");
        }

        let response = get(&server, "/static/levels/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<html>levels</html>");
    }

    #[tokio::test]
    async fn test_hostile_path_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_for(dir.path()).await;

        let response = get(&server, "/static/..%2F..%2Fetc%2Fpasswd").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
