//! site-scout: a bounded single-domain contact crawler
//!
//! This crate crawls the pages reachable from a start URL, stays within the
//! start URL's registered domain, and harvests e-mail addresses and phone
//! numbers into a deduplicated, canonicalised JSON result.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod server;
pub mod url;

use thiserror::Error;

/// Main error type for site-scout operations
///
/// Per-page fetch and parse failures are absorbed by the crawl engine; the
/// only runtime error a caller sees is an invalid start URL.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("invalid start URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("failed to parse URL: {0}")]
    Parse(String),

    #[error("unsupported URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// Result type alias for site-scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{ConfigOverrides, CrawlConfig};
pub use crawler::{parse_site, parse_site_async, CrawlResult};
pub use url::{canonicalize, CanonicalUrl, DomainGate};
