//! Path-addressed HTTP proxy.
//!
//! A request path names both the proxy mode and the destination:
//!
//! ```text
//! /forward/example.com/page   → 307 redirect to http://example.com/page
//! /reverse/example.com/page   → fetched and relayed as if served here
//! /example.com/page           → same as /forward/...
//! /logo.png + Referer of a proxied page → re-anchored on that page's origin
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
