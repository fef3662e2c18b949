//! Mode keyword and destination extraction.
//!
//! Path grammar: `{mode}/{host}/{path...}` where `mode` is `forward` or
//! `reverse`, or just `{host}/{path...}` which implies forward mode. The
//! destination is always built with the `http` scheme.

use std::fmt;

use super::canonical::CanonicalPath;

const FORWARD_KEYWORD: &str = "forward";
const REVERSE_KEYWORD: &str = "reverse";

/// How a resolved destination is served back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyMode {
    /// Client is redirected to the real origin.
    Forward,
    /// Proxy fetches the origin and relays the response as its own.
    Reverse,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Forward => FORWARD_KEYWORD,
            ProxyMode::Reverse => REVERSE_KEYWORD,
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path shape the request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `/forward/{host}/...`
    Forward,
    /// `/reverse/{host}/...`
    Reverse,
    /// `/{host}/...`, no keyword. The first segment belongs to the host.
    ImplicitForward,
}

impl RouteKind {
    /// Decode the first path segment.
    pub fn from_segment(segment: &str) -> Self {
        match segment {
            FORWARD_KEYWORD => RouteKind::Forward,
            REVERSE_KEYWORD => RouteKind::Reverse,
            _ => RouteKind::ImplicitForward,
        }
    }

    pub fn mode(&self) -> ProxyMode {
        match self {
            RouteKind::Reverse => ProxyMode::Reverse,
            RouteKind::Forward | RouteKind::ImplicitForward => ProxyMode::Forward,
        }
    }
}

/// Result of parsing a canonical path. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    kind: RouteKind,
    raw_destination: String,
}

impl ParsedRequest {
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn mode(&self) -> ProxyMode {
        self.kind.mode()
    }

    /// Destination string as built, not yet validated as a URL.
    pub fn raw_destination(&self) -> &str {
        &self.raw_destination
    }

    pub(crate) fn with_destination(&self, raw_destination: String) -> Self {
        Self {
            kind: self.kind,
            raw_destination,
        }
    }
}

/// Split a canonical path into its mode and raw destination.
///
/// Never fails: an unusable destination is reported later, when the string
/// is parsed as a URL.
pub fn parse_target(path: &CanonicalPath) -> ParsedRequest {
    let mut segments = path.segments();
    let kind = RouteKind::from_segment(segments.next().unwrap_or_default());

    let host_and_path = match kind {
        RouteKind::Forward | RouteKind::Reverse => segments.collect::<Vec<_>>().join("/"),
        RouteKind::ImplicitForward => path.path().to_string(),
    };

    ParsedRequest {
        kind,
        raw_destination: path.with_query(format!("http://{host_and_path}")),
    }
}
