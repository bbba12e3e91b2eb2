//! Mirror subsystem: the fetch-on-miss cache.
//!
//! # Data Flow
//! ```text
//! raw request path
//!     → path.rs (normalize, reject traversal)       → LogicalPath
//!     → resolver.rs (exists under mirror root?)     → Hit(local) | Miss
//!     → fetcher.rs on Miss
//!         → flight.rs (one download per path)
//!         → upstream.rs (GET origin/path)
//!         → temp file + rename into the mirror
//!     → local path, or error.rs FetchError
//! ```
//!
//! # Design Decisions
//! - Fetch once, keep forever: no expiry, revalidation, or eviction
//! - A file under the mirror root is always complete
//! - The HTTP client is built once and injected, never global

pub mod error;
pub mod fetcher;
pub mod flight;
pub mod path;
pub mod resolver;
pub mod upstream;

pub use error::FetchError;
pub use fetcher::{sweep_partials, FetchEngine};
pub use flight::{FetchResult, FlightMap};
pub use path::{LogicalPath, PathError};
pub use resolver::{CacheResolver, Resolution};
pub use upstream::{Upstream, UpstreamInitError};
