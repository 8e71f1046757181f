use crate::url::CanonicalUrl;
use psl::Psl;

/// Extracts the registered domain (eTLD+1) of a host using the Public
/// Suffix List.
///
/// Returns `None` for hosts the list cannot resolve, such as IP literals
/// or single-label names.
pub fn registered_domain(host: &str) -> Option<String> {
    let domain = psl::List.domain(host.as_bytes())?;
    Some(String::from_utf8_lossy(domain.as_bytes()).into_owned())
}

/// Same-site scope check anchored to the crawl's start URL
///
/// A candidate is in scope when it shares the start URL's registered
/// domain, so `sub.example.com` and `example.com` match while
/// `example.org` does not. Hosts without a registrable domain (IP
/// literals) fall back to exact host equality.
#[derive(Debug, Clone)]
pub struct DomainGate {
    host: String,
    registered: Option<String>,
}

impl DomainGate {
    pub fn new(start: &CanonicalUrl) -> Self {
        let host = start.host().to_string();
        let registered = if start.has_ip_host() {
            None
        } else {
            registered_domain(&host)
        };
        Self { host, registered }
    }

    pub fn in_scope(&self, candidate: &CanonicalUrl) -> bool {
        if candidate.has_ip_host() || self.registered.is_none() {
            return self.host == candidate.host();
        }
        match registered_domain(candidate.host()) {
            Some(candidate_registered) => self.registered.as_deref() == Some(&candidate_registered),
            None => false,
        }
    }
}
