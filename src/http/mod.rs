//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route dispatch)
//!     → request.rs (request ID)
//!     → [mirror: resolve, fetch on miss]
//!     → response.rs (serve file | 307 | error status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{CacheStatus, RequestOrigin, X_MIRROR_CACHE};
pub use server::{AppState, HttpServer};
