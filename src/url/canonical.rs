use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// A canonicalised, comparable URL
///
/// Two URLs are equal when their keys are equal; the engine fetches each
/// key at most once. The key is the full serialisation
/// `scheme://host[:port]path[?query]` with the fragment removed, the
/// default port elided and (unless `include_query` was set) the query
/// dropped.
#[derive(Debug, Clone)]
pub struct CanonicalUrl {
    url: Url,
}

impl CanonicalUrl {
    /// The underlying parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The deduplication key; also the exact string the fetcher requests.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    /// Lowercased ASCII host.
    pub fn host(&self) -> &str {
        // Canonicalisation guarantees a host is present
        self.url.host_str().unwrap_or_default()
    }

    /// Path component, always starting with `/`.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// `scheme://host[:port]`, no trailing slash.
    pub fn origin(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}://{}:{}", self.url.scheme(), self.host(), port),
            None => format!("{}://{}", self.url.scheme(), self.host()),
        }
    }

    /// True when the host is an IP literal rather than a DNS name.
    pub fn has_ip_host(&self) -> bool {
        matches!(
            self.url.host(),
            Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))
        )
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CanonicalUrl {}

impl std::hash::Hash for CanonicalUrl {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Canonicalises a raw URL string, optionally resolving it against a base.
///
/// Rules:
/// - relative references resolve against `base` with standard join semantics
/// - only `http` and `https` are accepted; `javascript:`, `data:`,
///   fragment-only and empty hrefs are rejected
/// - the host is lowercased and IDN labels are converted to punycode,
///   default ports are stripped and `.`/`..` path segments collapsed
///   (the WHATWG parsing the `url` crate performs)
/// - the fragment is dropped; the query is dropped unless `include_query`,
///   and kept in original parameter order otherwise
///
/// Canonicalising an already canonical URL returns it unchanged.
pub fn canonicalize(raw: &str, base: Option<&Url>, include_query: bool) -> UrlResult<CanonicalUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Err(UrlError::Parse("empty or fragment-only URL".to_string()));
    }

    let mut url = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    }
    .map_err(|e| UrlError::Parse(format!("{trimmed:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    if !include_query {
        url.set_query(None);
    } else if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(CanonicalUrl { url })
}
