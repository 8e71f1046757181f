use phonenumber::{country, Mode};
use regex::Regex;
use std::collections::BTreeSet;

/// Harvests phone numbers from page text and `tel:` targets, returning
/// them canonicalised to E.164.
///
/// `+`-prefixed candidates are parsed without a region hint; everything
/// else is tried against the configured regions in order. A candidate is
/// kept only when the phone metadata validates it.
pub struct PhoneExtractor {
    regions: Vec<country::Id>,
    candidate_re: Regex,
    idd_re: Regex,
}

impl PhoneExtractor {
    pub fn new(regions: &[String]) -> Self {
        let regions = regions
            .iter()
            .filter_map(|code| match code.parse::<country::Id>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!("ignoring unknown phone region {code:?}");
                    None
                }
            })
            .collect();

        Self {
            regions,
            candidate_re: Regex::new(r"\+?\d[\d\s().\-]{6,}\d").expect("candidate regex is valid"),
            idd_re: Regex::new(r"(?:^|[^\d+])((?:00|011)[\s().\-]*[1-9](?:[\s().\-]*\d){6,})")
                .expect("idd regex is valid"),
        }
    }

    /// Runs the full pipeline over one page.
    pub fn extract(&self, page_text: &str, tel_targets: &[String]) -> BTreeSet<String> {
        let mut phones = BTreeSet::new();

        for m in self.candidate_re.find_iter(page_text) {
            if let Some(phone) = self.parse_candidate(m.as_str()) {
                phones.insert(phone);
            }
        }

        // International numbers written with a 00/011 dialling prefix
        for captures in self.idd_re.captures_iter(page_text) {
            let normalized = normalize_idd_prefix(&captures[1]);
            if normalized.starts_with('+') {
                if let Some(phone) = parse_with_region(&normalized, None) {
                    phones.insert(phone);
                }
            }
        }

        for target in tel_targets {
            let cleaned = normalize_idd_prefix(&strip_visual_chars(target));
            if cleaned.is_empty() {
                continue;
            }
            if let Some(phone) = self.parse_candidate(&cleaned) {
                phones.insert(phone);
            }
        }

        phones
    }

    /// Parses one candidate, region-free for `+` numbers, otherwise trying
    /// each configured region in order.
    fn parse_candidate(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.starts_with('+') {
            return parse_with_region(trimmed, None);
        }
        self.regions
            .iter()
            .find_map(|region| parse_with_region(trimmed, Some(*region)))
    }
}

/// Parses and validates one number; returns E.164 on success.
fn parse_with_region(raw: &str, region: Option<country::Id>) -> Option<String> {
    let number = phonenumber::parse(region, raw).ok()?;
    if !phonenumber::is_valid(&number) {
        return None;
    }
    Some(phonenumber::format(&number).mode(Mode::E164).to_string())
}

/// Removes the separators people type into phone numbers.
fn strip_visual_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

/// Guesses a phone region from a host's top-level domain.
///
/// Used only when no regions are configured; generic TLDs infer nothing.
pub fn infer_region(host: &str) -> Option<String> {
    let tld = host.trim_matches('.').rsplit('.').next()?.to_ascii_lowercase();
    let region = match tld.as_str() {
        "ru" => "RU",
        "by" => "BY",
        "kz" => "KZ",
        "ua" => "UA",
        "kg" => "KG",
        "uz" => "UZ",
        "am" => "AM",
        "az" => "AZ",
        "ge" => "GE",
        "md" => "MD",
        "ee" => "EE",
        "lv" => "LV",
        "lt" => "LT",
        "pl" => "PL",
        "de" => "DE",
        "fr" => "FR",
        "it" => "IT",
        "es" => "ES",
        "pt" => "PT",
        "nl" => "NL",
        "be" => "BE",
        "ch" => "CH",
        "at" => "AT",
        "se" => "SE",
        "no" => "NO",
        "fi" => "FI",
        "dk" => "DK",
        "ie" => "IE",
        "uk" | "gb" => "GB",
        "us" => "US",
        "ca" => "CA",
        "au" => "AU",
        "nz" => "NZ",
        "jp" => "JP",
        "cn" => "CN",
        "in" => "IN",
        _ => return None,
    };
    Some(region.to_string())
}

/// Rewrites a leading international dialling prefix (`00` or `011`) to `+`.
fn normalize_idd_prefix(raw: &str) -> String {
    let value = raw.trim();
    if let Some(rest) = value.strip_prefix("011") {
        return format!("+{rest}");
    }
    if let Some(rest) = value.strip_prefix("00") {
        return format!("+{rest}");
    }
    value.to_string()
}
