//! Referer-based re-anchoring of relative requests.
//!
//! A page served through the proxy at `/reverse/origin.example/page.html`
//! that references `/logo.png` makes the browser request `/logo.png` from
//! the proxy, with the page as `Referer`. The rewriter recovers the origin
//! the referring page was proxying and points the request there instead.
//!
//! # Design Decisions
//! - Only referers whose authority equals the proxy's own host qualify
//! - Any parse failure disables rewriting for that request, never errors
//! - Host comparison is case-insensitive; the port is part of the authority
//!   unless it is 80 or 443, on either side

use url::Url;

use super::canonical::CanonicalPath;
use super::target::parse_target;

/// Rewrites destinations of requests referred by pages this proxy served.
#[derive(Debug, Clone, Default)]
pub struct RefererRewriter {
    self_host: Option<String>,
}

impl RefererRewriter {
    /// `self_host` is the proxy's externally visible `host[:port]`.
    /// An empty host disables rewriting entirely.
    pub fn new(self_host: &str) -> Self {
        let host = self_host.trim();
        if host.is_empty() {
            return Self::default();
        }

        let normalized = Url::parse(&format!("http://{host}"))
            .ok()
            .and_then(|url| authority(&url))
            .unwrap_or_else(|| host.to_lowercase());
        Self {
            self_host: Some(normalized),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.self_host.is_some()
    }

    /// Destination for `current` re-anchored on the referer's proxied origin.
    ///
    /// Returns `None` when no rewriting applies: no referer, a referer from
    /// another host, or a referer that does not itself resolve to an origin.
    pub fn origin_destination(&self, current: &CanonicalPath, referer: Option<&str>) -> Option<String> {
        let self_host = self.self_host.as_deref()?;
        let referer = referer.map(str::trim).filter(|r| !r.is_empty())?;

        let referer_url = match Url::parse(referer) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(referer = %referer, error = %e, "Ignoring unparsable referer");
                return None;
            }
        };

        if authority(&referer_url)? != self_host {
            return None;
        }

        // What the referring page was itself proxying.
        let proxied = parse_target(&CanonicalPath::from_url(&referer_url));
        let proxied_url = match Url::parse(proxied.raw_destination()) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(
                    referer = %referer,
                    error = %e,
                    "Referer does not carry a proxied origin"
                );
                return None;
            }
        };

        let origin = proxied_url.origin();
        if !origin.is_tuple() {
            return None;
        }

        Some(format!("{}/{}", origin.ascii_serialization(), current))
    }
}

/// `host[:port]` of a URL, lowercased. Ports 80 and 443 are omitted
/// whatever the scheme.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) if port != 80 && port != 443 => format!("{host}:{port}"),
        _ => host,
    })
}
