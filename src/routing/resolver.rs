//! Destination resolution.
//!
//! Composes the target parser and the referer rewriter into a single pure
//! step: canonical path + optional `Referer` in, absolute URL and mode out.

use url::Url;

use super::canonical::CanonicalPath;
use super::referer::RefererRewriter;
use super::target::{parse_target, ParsedRequest, ProxyMode, RouteKind};

/// Errors produced while resolving a destination.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The destination string is not a valid absolute URL.
    #[error("{source}")]
    MalformedDestination {
        destination: String,
        #[source]
        source: url::ParseError,
    },
}

/// Fully parsed outgoing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub mode: ProxyMode,
    pub kind: RouteKind,
    pub url: Url,
    /// Set when the destination came from the referer's proxied origin.
    pub rewritten_from_referer: bool,
}

impl ResolvedDestination {
    /// `host[:port]` of the destination, as sent in a `Host` header.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// Stateless resolver shared by every request handler.
#[derive(Debug, Clone, Default)]
pub struct DestinationResolver {
    rewriter: RefererRewriter,
}

impl DestinationResolver {
    /// Create a resolver for a proxy reachable at `self_host`.
    pub fn new(self_host: &str) -> Self {
        Self {
            rewriter: RefererRewriter::new(self_host),
        }
    }

    /// Parse the request path, let the referer override the destination,
    /// then validate the result as a URL.
    pub fn resolve(&self, path: &CanonicalPath, referer: Option<&str>) -> Result<ResolvedDestination, ResolveError> {
        let parsed = parse_target(path);

        let (parsed, rewritten) = match self.rewriter.origin_destination(path, referer) {
            Some(destination) => (parsed.with_destination(destination), true),
            None => (parsed, false),
        };

        to_resolved(parsed, rewritten)
    }
}

fn to_resolved(parsed: ParsedRequest, rewritten_from_referer: bool) -> Result<ResolvedDestination, ResolveError> {
    let url = Url::parse(parsed.raw_destination()).map_err(|source| ResolveError::MalformedDestination {
        destination: parsed.raw_destination().to_string(),
        source,
    })?;

    Ok(ResolvedDestination {
        mode: parsed.mode(),
        kind: parsed.kind(),
        url,
        rewritten_from_referer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> CanonicalPath {
        let (p, q) = match p.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (p, None),
        };
        CanonicalPath::new(p, q)
    }

    #[test]
    fn test_referer_overrides_naive_parse() {
        let resolver = DestinationResolver::new("proxyhost");
        let resolved = resolver
            .resolve(
                &path("/logo.png"),
                Some("https://proxyhost/reverse/origin.example/page.html"),
            )
            .unwrap();
        assert_eq!(resolved.url.as_str(), "http://origin.example/logo.png");
        assert!(resolved.rewritten_from_referer);
        // Mode comes from the current request, not the referring page.
        assert_eq!(resolved.mode, ProxyMode::Forward);
        assert_eq!(resolved.kind, RouteKind::ImplicitForward);
    }

    #[test]
    fn test_without_referer_uses_naive_parse() {
        let resolver = DestinationResolver::new("proxyhost");
        let resolved = resolver.resolve(&path("/logo.png"), None).unwrap();
        assert_eq!(resolved.url.as_str(), "http://logo.png/");
        assert!(!resolved.rewritten_from_referer);
        assert_eq!(resolved.mode, ProxyMode::Forward);
    }

    #[test]
    fn test_reverse_destination() {
        let resolver = DestinationResolver::new("proxyhost");
        let resolved = resolver
            .resolve(&path("/reverse/example.com:8080/a/b?x=1"), None)
            .unwrap();
        assert_eq!(resolved.mode, ProxyMode::Reverse);
        assert_eq!(resolved.url.as_str(), "http://example.com:8080/a/b?x=1");
        assert_eq!(resolved.authority(), "example.com:8080");
    }

    #[test]
    fn test_default_port_is_not_in_authority() {
        let resolver = DestinationResolver::default();
        let resolved = resolver.resolve(&path("/reverse/example.com:80/"), None).unwrap();
        assert_eq!(resolved.authority(), "example.com");
    }

    #[test]
    fn test_malformed_destination() {
        let resolver = DestinationResolver::new("proxyhost");
        for bad in ["/reverse/example.com:99999/", "/forward", "/reverse/"] {
            let err = resolver.resolve(&path(bad), None).unwrap_err();
            let ResolveError::MalformedDestination { destination, .. } = &err;
            assert!(destination.starts_with("http://"), "{bad}");
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_bad_referer_falls_back() {
        let resolver = DestinationResolver::new("proxyhost");
        let resolved = resolver
            .resolve(&path("/forward/example.com/x"), Some("::garbage::"))
            .unwrap();
        assert_eq!(resolved.url.as_str(), "http://example.com/x");
        assert!(!resolved.rewritten_from_referer);
    }
}
