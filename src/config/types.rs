use serde::Deserialize;

/// Crawl configuration
///
/// Immutable after construction; the engine and every component hold it by
/// shared reference. Defaults follow the documented CLI defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlConfig {
    /// Wall-clock budget for the whole crawl, in seconds
    pub max_seconds: f64,

    /// Maximum link depth from the start URL (0 = start page only)
    pub max_depth: u32,

    /// Maximum number of pages dispatched to the fetcher
    pub max_pages: usize,

    /// Maximum number of links taken from a single page
    pub max_links_per_page: usize,

    /// Response body cap in bytes; larger bodies are truncated silently
    pub max_body_bytes: usize,

    /// Maximum number of concurrent HTTP fetches
    pub max_concurrency: usize,

    /// Per-attempt timeout (connect + read), in seconds
    pub request_timeout: f64,

    /// Number of retries after the first attempt
    pub retry_total: u32,

    /// Base factor for exponential retry backoff, in seconds
    pub retry_backoff_factor: f64,

    /// ISO-3166-1 alpha-2 region hints for phone parsing, tried in order.
    /// Empty means: infer a region from the start host's TLD.
    pub phone_regions: Vec<String>,

    /// Keep only e-mail addresses whose domain equals or is a subdomain of
    /// one of these suffixes. Empty means keep everything.
    pub email_domain_allowlist: Vec<String>,

    /// Rank contact-looking URLs ahead of generic content
    pub focused_crawling: bool,

    /// Keep query strings when canonicalising URLs
    pub include_query: bool,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_seconds: 30.0,
            max_depth: 0,
            max_pages: 200,
            max_links_per_page: 200,
            max_body_bytes: 2_000_000,
            max_concurrency: 4,
            request_timeout: 10.0,
            retry_total: 2,
            retry_backoff_factor: 0.5,
            phone_regions: Vec::new(),
            email_domain_allowlist: Vec::new(),
            focused_crawling: true,
            include_query: false,
            user_agent: "site-parser/0.1.0".to_string(),
        }
    }
}

/// Partial configuration merged over defaults
///
/// Every field is optional; `None` leaves the underlying value untouched.
/// This is the shape config files, environment variables and API overrides
/// all funnel through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub max_seconds: Option<f64>,
    pub max_depth: Option<u32>,
    pub max_pages: Option<usize>,
    pub max_links_per_page: Option<usize>,
    pub max_body_bytes: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub request_timeout: Option<f64>,
    pub retry_total: Option<u32>,
    pub retry_backoff_factor: Option<f64>,
    #[serde(deserialize_with = "string_or_seq", default)]
    pub phone_regions: Option<Vec<String>>,
    #[serde(deserialize_with = "string_or_seq", default)]
    pub email_domain_allowlist: Option<Vec<String>>,
    pub focused_crawling: Option<bool>,
    pub include_query: Option<bool>,
    pub user_agent: Option<String>,
}

impl ConfigOverrides {
    /// Applies the overrides on top of `config`, normalising list fields.
    pub fn apply(&self, config: &mut CrawlConfig) {
        if let Some(v) = self.max_seconds {
            config.max_seconds = v;
        }
        if let Some(v) = self.max_depth {
            config.max_depth = v;
        }
        if let Some(v) = self.max_pages {
            config.max_pages = v;
        }
        if let Some(v) = self.max_links_per_page {
            config.max_links_per_page = v;
        }
        if let Some(v) = self.max_body_bytes {
            config.max_body_bytes = v;
        }
        if let Some(v) = self.max_concurrency {
            config.max_concurrency = v;
        }
        if let Some(v) = self.request_timeout {
            config.request_timeout = v;
        }
        if let Some(v) = self.retry_total {
            config.retry_total = v;
        }
        if let Some(v) = self.retry_backoff_factor {
            config.retry_backoff_factor = v;
        }
        if let Some(ref v) = self.phone_regions {
            config.phone_regions = normalize_regions(v);
        }
        if let Some(ref v) = self.email_domain_allowlist {
            config.email_domain_allowlist = normalize_domain_suffixes(v);
        }
        if let Some(v) = self.focused_crawling {
            config.focused_crawling = v;
        }
        if let Some(v) = self.include_query {
            config.include_query = v;
        }
        if let Some(ref v) = self.user_agent {
            config.user_agent = v.clone();
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.max_seconds.is_none()
            && self.max_depth.is_none()
            && self.max_pages.is_none()
            && self.max_links_per_page.is_none()
            && self.max_body_bytes.is_none()
            && self.max_concurrency.is_none()
            && self.request_timeout.is_none()
            && self.retry_total.is_none()
            && self.retry_backoff_factor.is_none()
            && self.phone_regions.is_none()
            && self.email_domain_allowlist.is_none()
            && self.focused_crawling.is_none()
            && self.include_query.is_none()
            && self.user_agent.is_none()
    }
}

/// Uppercases, deduplicates and drops empty or `ZZ` region codes,
/// preserving first-seen order.
pub fn normalize_regions(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in raw {
        for part in item.replace(';', ",").split(',') {
            let cleaned = part.trim().to_ascii_uppercase();
            if cleaned.is_empty() || cleaned == "ZZ" {
                continue;
            }
            if seen.insert(cleaned.clone()) {
                out.push(cleaned);
            }
        }
    }
    out
}

/// Lowercases domain suffixes and strips leading `@`/`.`, deduplicating
/// while preserving first-seen order.
pub fn normalize_domain_suffixes(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in raw {
        for part in item.replace(';', ",").split(',') {
            let cleaned = part
                .trim()
                .to_ascii_lowercase()
                .trim_start_matches(['@', '.'])
                .to_string();
            if cleaned.is_empty() {
                continue;
            }
            if seen.insert(cleaned.clone()) {
                out.push(cleaned);
            }
        }
    }
    out
}

/// Accepts either `"RU,BY"` or `["RU", "BY"]` for list-valued fields.
fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<StringOrSeq>::deserialize(deserializer)? {
        None => None,
        Some(StringOrSeq::One(s)) => Some(vec![s]),
        Some(StringOrSeq::Many(v)) => Some(v),
    })
}
