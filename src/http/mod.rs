//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, landing page, ACME files)
//!     → request.rs (request ID)
//!     → [routing resolves mode + destination]
//!     → dispatch.rs (outgoing request, upstream round trip, redirect rewrite)
//!     → error.rs (failures → 400 / 502 / 500)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod error;
pub mod landing;
pub mod request;
pub mod server;

pub use dispatch::{DispatchError, Dispatcher};
pub use error::ProxyError;
pub use landing::{LandingError, LandingPage};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
