//! HTTP fetching with retry, redirect gating and body capping
//!
//! Redirects are followed manually so every hop passes canonicalisation
//! and the domain gate; a redirect pointing off-domain ends the chain as a
//! failed fetch. Bodies are read in chunks and truncated silently at the
//! configured cap before charset-aware decoding.

use crate::config::CrawlConfig;
use crate::url::{canonicalize, CanonicalUrl, DomainGate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

const MAX_REDIRECTS: u32 = 5;

/// A decoded page after a successful GET
#[derive(Debug)]
pub struct FetchedPage {
    /// Canonical URL of the last redirect hop
    pub final_url: CanonicalUrl,

    /// HTTP status of the final response
    pub status: u16,

    /// Content-Type header of the final response
    pub content_type: String,

    /// Decoded body; empty for non-HTML-like content types
    pub text: String,

    /// Bytes actually read, never more than the configured cap
    pub bytes_read: usize,

    /// Whether the content type was HTML-like and the body decoded
    pub is_html: bool,
}

/// Fetch failures, all absorbed by the engine
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    HttpStatus {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("redirect out of scope: {0}")]
    RedirectOutOfScope(String),

    #[error("invalid redirect target: {0}")]
    RedirectTarget(String),

    #[error("too many redirects")]
    RedirectLimit,
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::HttpStatus { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Server-requested delay, honoured for 429/503 responses.
    fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::HttpStatus {
                status: 429 | 503,
                retry_after,
            } => *retry_after,
            _ => None,
        }
    }
}

/// Shared HTTP fetcher; one instance (and one connection pool) per crawl.
pub struct Fetcher {
    client: Client,
    config: CrawlConfig,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html, */*;q=0.1"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetches one URL with retries, bounded by `deadline` (the global
    /// time budget) and the per-attempt request timeout.
    pub async fn fetch(
        &self,
        url: &CanonicalUrl,
        gate: &DomainGate,
        deadline: Instant,
    ) -> Result<FetchedPage, FetchError> {
        let request_timeout = Duration::from_secs_f64(self.config.request_timeout);
        let mut last_error = FetchError::Timeout;

        for attempt in 0..=self.config.retry_total {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_factor * f64::from(1u32 << (attempt - 1));
                let delay = last_error
                    .retry_after()
                    .unwrap_or_else(|| Duration::from_secs_f64(backoff));
                tracing::debug!("retry {attempt} for {url} after {delay:?}");
                if Instant::now() + delay >= deadline {
                    return Err(FetchError::Timeout);
                }
                tokio::time::sleep(delay).await;
            }

            let attempt_deadline = std::cmp::min(Instant::now() + request_timeout, deadline);
            if attempt_deadline <= Instant::now() {
                return Err(FetchError::Timeout);
            }

            let outcome =
                tokio::time::timeout_at(attempt_deadline, self.attempt(url, gate)).await;
            match outcome {
                Err(_) => last_error = FetchError::Timeout,
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(error)) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }

    /// One attempt: follow redirects within scope, then read and decode.
    async fn attempt(
        &self,
        url: &CanonicalUrl,
        gate: &DomainGate,
    ) -> Result<FetchedPage, FetchError> {
        let mut current = url.clone();

        for _hop in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(current.key())
                .send()
                .await
                .map_err(classify_error)?;

            let status = response.status();
            if status.is_redirection() {
                let target = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        FetchError::RedirectTarget("missing Location header".to_string())
                    })?;
                let next = canonicalize(target, Some(current.url()), self.config.include_query)
                    .map_err(|e| FetchError::RedirectTarget(e.to_string()))?;
                if !gate.in_scope(&next) {
                    return Err(FetchError::RedirectOutOfScope(next.to_string()));
                }
                tracing::debug!("redirect {current} -> {next}");
                current = next;
                continue;
            }

            if !status.is_success() {
                let retry_after = parse_retry_after(response.headers());
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    retry_after,
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            if !is_html_like(&content_type) {
                // Counts against the page budget, yields no extracts
                tracing::debug!("skipping body of {current}: content-type {content_type:?}");
                return Ok(FetchedPage {
                    final_url: current,
                    status: status.as_u16(),
                    content_type,
                    text: String::new(),
                    bytes_read: 0,
                    is_html: false,
                });
            }

            let body = self.read_capped(response).await?;
            let bytes_read = body.len();
            let text = decode_body(&body, &content_type);
            return Ok(FetchedPage {
                final_url: current,
                status: status.as_u16(),
                content_type,
                text,
                bytes_read,
                is_html: true,
            });
        }

        Err(FetchError::RedirectLimit)
    }

    /// Reads at most `max_body_bytes`, truncating silently.
    async fn read_capped(&self, mut response: Response) -> Result<Vec<u8>, FetchError> {
        let cap = self.config.max_body_bytes;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
            if body.len() + chunk.len() >= cap {
                let take = cap - body.len();
                body.extend_from_slice(&chunk[..take]);
                tracing::debug!(
                    "body of {} truncated at {cap} bytes",
                    response.url()
                );
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Network(format!("connection failed: {error}"))
    } else {
        FetchError::Network(error.to_string())
    }
}

/// HTML-like content types get their bodies decoded; everything else is
/// fetched but discarded. A missing Content-Type is treated as HTML.
fn is_html_like(content_type: &str) -> bool {
    let value = content_type.to_ascii_lowercase();
    if value.is_empty() {
        return true;
    }
    ["text/html", "application/xhtml+xml", "text/plain"]
        .iter()
        .any(|token| value.contains(token))
}

/// Decodes the body honouring a declared charset, with lossy UTF-8 as the
/// fallback for missing or unknown declarations.
fn decode_body(body: &[u8], content_type: &str) -> String {
    let encoding = charset_label(content_type)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    let lowered = content_type.to_ascii_lowercase();
    let start = lowered.find("charset=")? + "charset=".len();
    let rest = &lowered[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    let label = rest[..end].trim().trim_matches('"').to_string();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            let error = FetchError::HttpStatus {
                status,
                retry_after: None,
            };
            assert!(error.is_retryable(), "status {status} should retry");
        }
        for status in [400, 403, 404, 410] {
            let error = FetchError::HttpStatus {
                status,
                retry_after: None,
            };
            assert!(!error.is_retryable(), "status {status} should not retry");
        }
    }

    #[test]
    fn test_network_and_timeout_retryable() {
        assert!(FetchError::Network("boom".to_string()).is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(!FetchError::RedirectOutOfScope("x".to_string()).is_retryable());
    }

    #[test]
    fn test_retry_after_only_for_429_and_503() {
        let delayed = FetchError::HttpStatus {
            status: 503,
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(delayed.retry_after(), Some(Duration::from_secs(7)));

        let server_error = FetchError::HttpStatus {
            status: 500,
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(server_error.retry_after(), None);
    }

    #[test]
    fn test_is_html_like() {
        assert!(is_html_like("text/html; charset=utf-8"));
        assert!(is_html_like("application/xhtml+xml"));
        assert!(is_html_like("text/plain"));
        assert!(is_html_like(""));
        assert!(!is_html_like("application/pdf"));
        assert!(!is_html_like("image/png"));
        assert!(!is_html_like("application/json"));
    }

    #[test]
    fn test_charset_label() {
        assert_eq!(
            charset_label("text/html; charset=UTF-8").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            charset_label("text/html; charset=\"windows-1251\"; x=y").as_deref(),
            Some("windows-1251")
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_decode_body_with_declared_charset() {
        // "Привет" in windows-1251
        let body = [0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2];
        let text = decode_body(&body, "text/html; charset=windows-1251");
        assert_eq!(text, "Привет");
    }

    #[test]
    fn test_decode_body_invalid_utf8_is_lossy() {
        let body = [b'o', b'k', 0xFF, 0xFE];
        let text = decode_body(&body, "text/html");
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
