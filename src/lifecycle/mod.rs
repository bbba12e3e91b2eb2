//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → mirror root (create, sweep partials) → upstream client → engine
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an unusable mirror root or origin aborts startup
//! - Listeners start last (traffic only when ready)
//! - Detached fetch tasks are not awaited on shutdown; their temp files are
//!   swept on the next start

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
