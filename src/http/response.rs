//! Response shaping.
//!
//! # Responsibilities
//! - Serve a local mirror file (MIME, ranges, conditional GET via `ServeFile`)
//! - Redirect catch-all requests to their asset-subpath URL
//! - Map fetch failures to status codes without leaking detail
//!
//! # Design Decisions
//! - Catch-all hits and fetches answer 307 so the follow-up request lands on
//!   the static route, which serves the file
//! - Asset-subpath requests never redirect (that would loop)
//! - Error bodies carry only the canonical reason phrase

use std::path::Path;

use axum::{
    body::Body,
    http::{header::HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::mirror::{FetchError, LogicalPath};

/// Response header telling whether the body came from the mirror or upstream.
pub const X_MIRROR_CACHE: HeaderName = HeaderName::from_static("x-mirror-cache");

/// Where the served bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }

    fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

/// How a request reached the caching logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// `<static_prefix>/{path}`: serve the bytes.
    AssetSubpath,
    /// `/{path}`: send the client to the asset-subpath URL.
    CatchAll,
}

/// Decide the response for a resource that is now available locally.
pub async fn available(
    origin: RequestOrigin,
    static_prefix: &str,
    path: &LogicalPath,
    local: &Path,
    cache: CacheStatus,
    request: Request<Body>,
) -> Response {
    match origin {
        RequestOrigin::CatchAll => redirect_to_static(static_prefix, path, cache),
        RequestOrigin::AssetSubpath => serve_file(local, Some(cache), request).await,
    }
}

/// 307 to `<static_prefix>/<path>`.
pub fn redirect_to_static(static_prefix: &str, path: &LogicalPath, cache: CacheStatus) -> Response {
    let location = format!("{}/{}", static_prefix, path.encoded());
    let mut response = Redirect::temporary(&location).into_response();
    response
        .headers_mut()
        .insert(X_MIRROR_CACHE, cache.header_value());
    response
}

/// Hand a local file to the static-file service.
pub async fn serve_file(local: &Path, cache: Option<CacheStatus>, request: Request<Body>) -> Response {
    let mut response = match ServeFile::new(local).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    if let Some(cache) = cache {
        response
            .headers_mut()
            .insert(X_MIRROR_CACHE, cache.header_value());
    }
    response
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

/// Response for a failed fetch; the detail is logged, not returned.
pub fn fetch_failed(path: &LogicalPath, error: FetchError) -> Response {
    let status = error.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(path = %path, error = %error, "Serving 500 for failed fetch");
    } else {
        tracing::debug!(path = %path, error = %error, status = status.as_u16(), "Fetch declined");
    }
    error.into_response()
}
