//! Fetch-on-miss static mirror.
//!
//! Serves a site from a local directory and pulls any missing file from a
//! fixed upstream origin the first time it is asked for. Once a file is on
//! disk it is served from disk forever.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mirror;
pub mod observability;

pub use config::schema::MirrorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mirror::FetchEngine;
