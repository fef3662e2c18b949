//! Destination resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query, Referer)
//!     → canonical.rs (collapse path + query into a CanonicalPath)
//!     → target.rs (decode mode keyword, build raw destination)
//!     → referer.rs (re-anchor relative fetches on the proxied origin)
//!     → resolver.rs (parse into a ResolvedDestination)
//!     → Return: mode + absolute destination URL, or a client error
//! ```
//!
//! # Design Decisions
//! - Pure functions of their inputs; nothing here touches the network
//! - The resolver is built once from config and shared immutably
//! - Unknown first segments are a legitimate route, not an error
//! - Referer problems never fail a request, they just disable rewriting

pub mod canonical;
pub mod referer;
pub mod resolver;
pub mod target;

pub use canonical::CanonicalPath;
pub use referer::RefererRewriter;
pub use resolver::{DestinationResolver, ResolveError, ResolvedDestination};
pub use target::{parse_target, ParsedRequest, ProxyMode, RouteKind};
