//! HTML parsing and link discovery
//!
//! Parsing is lenient: whatever the server sent is parsed as far as
//! possible and never aborts the crawl. Links come from `a`/`area` hrefs;
//! `mailto:` and `tel:` targets are routed to the extractors instead of
//! the frontier.

use crate::url::{canonicalize, CanonicalUrl};
use scraper::{Html, Selector};
use std::collections::HashSet;

/// A candidate link together with the anchor text it was found under,
/// which the scheduler uses for focused-crawl scoring.
#[derive(Debug, Clone)]
pub struct CandidateLink {
    pub url: CanonicalUrl,
    pub anchor_text: String,
}

/// Everything extracted from one HTML document
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// Visible text, whitespace-joined, without script/style/noscript
    pub text: String,

    /// Canonicalised links in document order, deduplicated by key and
    /// truncated to the per-page cap
    pub links: Vec<CandidateLink>,

    /// Addresses taken from `mailto:` hrefs
    pub mailto_targets: Vec<String>,

    /// Numbers taken from `tel:` hrefs
    pub tel_targets: Vec<String>,

    /// Raw script bodies, kept for cloaked-email scanning
    pub scripts: Vec<String>,
}

/// Parses one document relative to its final URL.
pub fn parse_page(
    html: &str,
    final_url: &CanonicalUrl,
    include_query: bool,
    max_links: usize,
) -> ParsedPage {
    let document = Html::parse_document(html);

    let mut page = ParsedPage {
        text: visible_text(&document),
        ..ParsedPage::default()
    };

    let script_selector = Selector::parse("script").expect("script selector is valid");
    for element in document.select(&script_selector) {
        let body: String = element.text().collect();
        if !body.trim().is_empty() {
            page.scripts.push(body);
        }
    }

    let link_selector = Selector::parse("a[href], area[href]").expect("link selector is valid");
    let mut seen_keys = HashSet::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        let lowered = href.to_ascii_lowercase();
        if lowered.starts_with("mailto:") {
            if let Some(address) = parse_mailto(href) {
                page.mailto_targets.push(address);
            }
            continue;
        }
        if lowered.starts_with("tel:") {
            if let Some(number) = parse_tel(href) {
                page.tel_targets.push(number);
            }
            continue;
        }

        let Ok(url) = canonicalize(href, Some(final_url.url()), include_query) else {
            continue;
        };
        if page.links.len() >= max_links {
            continue;
        }
        if seen_keys.insert(url.key().to_string()) {
            let anchor_text = element.text().collect::<String>().trim().to_string();
            page.links.push(CandidateLink { url, anchor_text });
        }
    }

    page
}

/// Collects visible text with inter-element whitespace separators,
/// skipping script, style and noscript contents.
fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let parent_tag = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_ascii_lowercase()));
        if matches!(parent_tag.as_deref(), Some("script" | "style" | "noscript")) {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}

/// Returns the first address of a `mailto:` href.
fn parse_mailto(href: &str) -> Option<String> {
    let raw = href.split_once(':')?.1;
    let raw = raw.split('?').next().unwrap_or("");
    let decoded = percent_decode(raw);
    let first = decoded.split(',').next().unwrap_or("").trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Returns the number of a `tel:` href, dropping parameters.
fn parse_tel(href: &str) -> Option<String> {
    let raw = href.split_once(':')?.1;
    let raw = raw.split('?').next().unwrap_or("");
    let raw = raw.split(';').next().unwrap_or("");
    let decoded = percent_decode(raw);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decodes `%XX` escapes, leaving malformed sequences alone.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &input[i + 1..i + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
