//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging-ready → Metrics → HttpServer → Listener
//!
//! Shutdown (shutdown.rs + signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger → listener stops, in-flight drains
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
