//! Path and query normalization.
//!
//! A request's path and query string are collapsed into one [`CanonicalPath`],
//! the single unit the target parser works on. The path keeps its percent
//! encoding exactly as received; query pairs are kept in wire order as raw
//! decoded bytes and re-serialized with `application/x-www-form-urlencoded`
//! rules, so a `?` or `&` inside a value is always escaped and can never be
//! mistaken for a separator. Values need not be UTF-8: legacy-charset escapes
//! such as `%E9` reach the destination byte for byte.

use std::fmt;

use axum::http::Uri;
use percent_encoding::percent_decode_str;
use url::{form_urlencoded, Url};

/// One decoded `key=value` pair.
pub type QueryPair = (Vec<u8>, Vec<u8>);

/// Request path with surrounding slashes removed, plus its query pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPath {
    path: String,
    query: Vec<QueryPair>,
}

impl CanonicalPath {
    /// Build from a raw path and an optional raw query string.
    pub fn new(path: &str, query: Option<&str>) -> Self {
        Self {
            path: path.trim_matches('/').to_string(),
            query: query.map(parse_query).unwrap_or_default(),
        }
    }

    /// Canonical form of an inbound request URI.
    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(uri.path(), uri.query())
    }

    /// Canonical form of an absolute URL (used for `Referer` values).
    pub fn from_url(url: &Url) -> Self {
        Self::new(url.path(), url.query())
    }

    /// True for the root path with no query: the landing page.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty()
    }

    /// Trimmed path, still percent-encoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query pairs in the order they arrived.
    pub fn query(&self) -> &[QueryPair] {
        &self.query
    }

    /// `/`-separated path segments. An empty path yields one empty segment.
    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.path.split('/')
    }

    /// Serialized query, without the leading `?`. `None` when there are no pairs.
    pub fn query_string(&self) -> Option<String> {
        if self.query.is_empty() {
            return None;
        }

        let pairs: Vec<String> = self
            .query
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect();
        Some(pairs.join("&"))
    }

    /// Append the serialized query (if any) to `prefix`.
    pub(crate) fn with_query(&self, mut prefix: String) -> String {
        if let Some(query) = self.query_string() {
            prefix.push('?');
            prefix.push_str(&query);
        }
        prefix
    }
}

/// Split a raw query on `&` and `=`, decoding `+` and percent-escapes to bytes.
fn parse_query(raw: &str) -> Vec<QueryPair> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> Vec<u8> {
    percent_decode_str(&raw.replace('+', " ")).collect()
}

fn encode_component(bytes: &[u8]) -> String {
    form_urlencoded::byte_serialize(bytes).collect()
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_query(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(uri: &str) -> CanonicalPath {
        CanonicalPath::from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_root_is_empty() {
        assert!(canonical("/").is_empty());
        assert!(canonical("http://proxy.local").is_empty());
        assert_eq!(canonical("/").to_string(), "");
    }

    #[test]
    fn test_trims_surrounding_slashes() {
        let path = canonical("/reverse/example.com/a/b/");
        assert_eq!(path.path(), "reverse/example.com/a/b");
        assert_eq!(path.to_string(), "reverse/example.com/a/b");
    }

    #[test]
    fn test_query_pairs_keep_wire_order() {
        let path = canonical("/example.com/search?q=rust&page=2&q=more");
        assert_eq!(
            path.query(),
            &[
                (b"q".to_vec(), b"rust".to_vec()),
                (b"page".to_vec(), b"2".to_vec()),
                (b"q".to_vec(), b"more".to_vec()),
            ]
        );
        assert_eq!(path.to_string(), "example.com/search?q=rust&page=2&q=more");
    }

    #[test]
    fn test_separators_inside_values_are_escaped() {
        let path = canonical("/example.com/go?next=%2Fa%3Fb%3D1%26c&x=a+b");
        assert_eq!(path.query()[0].1, b"/a?b=1&c");
        assert_eq!(path.query()[1].1, b"a b");
        assert_eq!(
            path.to_string(),
            "example.com/go?next=%2Fa%3Fb%3D1%26c&x=a+b"
        );
    }

    #[test]
    fn test_non_utf8_values_keep_their_bytes() {
        let path = CanonicalPath::new("/reverse/example.com/search", Some("q=%FF%FE&latin=caf%E9"));
        assert_eq!(path.query()[0].1, vec![0xFF, 0xFE]);
        assert_eq!(path.query()[1].1, b"caf\xE9");
        assert_eq!(
            path.to_string(),
            "reverse/example.com/search?q=%FF%FE&latin=caf%E9"
        );
    }

    #[test]
    fn test_plus_and_encoded_plus() {
        let path = CanonicalPath::new("/x", Some("a=1+2&b=1%2B2&flag&&c="));
        assert_eq!(path.query()[0].1, b"1 2");
        assert_eq!(path.query()[1].1, b"1+2");
        assert_eq!(path.query()[2], (b"flag".to_vec(), Vec::new()));
        assert_eq!(path.to_string(), "x?a=1+2&b=1%2B2&flag=&c=");
    }

    #[test]
    fn test_query_only_is_not_empty() {
        let path = canonical("/?lang=en");
        assert!(!path.is_empty());
        assert_eq!(path.path(), "");
        assert_eq!(path.to_string(), "?lang=en");
    }

    #[test]
    fn test_from_referer_url() {
        let url = Url::parse("https://proxy.local/reverse/origin.example/page.html?v=3").unwrap();
        let path = CanonicalPath::from_url(&url);
        assert_eq!(path.path(), "reverse/origin.example/page.html");
        assert_eq!(path.query_string().as_deref(), Some("v=3"));
    }
}
