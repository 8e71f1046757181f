use regex::Regex;
use std::collections::BTreeSet;

/// Obfuscation patterns rewritten before the regex harvest. The list is
/// fixed; anything fancier is handled by the script uncloaker below.
const CLOAK_AT: &[&str] = &[" [at] ", "(at)", "@AT@"];
const CLOAK_DOT: &[&str] = &[" [dot] ", "(dot)"];

/// Characters trimmed from the edges of a regex candidate.
const EDGE_PUNCT: &[char] = &['.', ',', ';', ':', '(', ')', '[', ']', '<', '>', '"', '\''];

/// Harvests and validates e-mail addresses from page text, `mailto:`
/// targets and script bodies.
///
/// The local part is preserved as-is; the domain is lowercased. When the
/// allow-list is non-empty, only addresses whose domain equals or ends
/// with `.<entry>` are kept.
pub struct EmailExtractor {
    email_re: Regex,
    addy_re: Regex,
    js_token_re: Regex,
    allowlist: Vec<String>,
}

impl EmailExtractor {
    pub fn new(allowlist: &[String]) -> Self {
        Self {
            email_re: Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
                .expect("email regex is valid"),
            addy_re: Regex::new(r"(?i)^(?:var\s+)?(addy_text[a-z0-9]+|addy[a-z0-9]+)\s*=\s*(.+)$")
                .expect("addy regex is valid"),
            js_token_re: Regex::new(
                r#"'([^'\\]*(?:\\.[^'\\]*)*)'|"([^"\\]*(?:\\.[^"\\]*)*)"|([A-Za-z_][A-Za-z0-9_]*)"#,
            )
            .expect("js token regex is valid"),
            allowlist: allowlist.to_vec(),
        }
    }

    /// Runs the full pipeline over one page.
    pub fn extract(
        &self,
        page_text: &str,
        mailto_targets: &[String],
        scripts: &[String],
    ) -> BTreeSet<String> {
        let mut emails = BTreeSet::new();

        let uncloaked = uncloak(page_text);
        for m in self.email_re.find_iter(&uncloaked) {
            let candidate = m.as_str().trim_matches(EDGE_PUNCT);
            if let Some(email) = self.normalize(candidate) {
                emails.insert(email);
            }
        }

        for target in mailto_targets {
            if let Some(email) = self.normalize(target) {
                emails.insert(email);
            }
        }

        for script in scripts {
            for value in self.uncloak_script(script) {
                if let Some(email) = self.normalize(&value) {
                    emails.insert(email);
                }
            }
        }

        emails
    }

    /// Validates a candidate and returns it with the domain lowercased.
    fn normalize(&self, candidate: &str) -> Option<String> {
        let value = candidate.trim();
        let (local, domain) = split_addr_spec(value)?;
        let domain = domain.to_ascii_lowercase();

        if !self.allowlist.is_empty() && !self.domain_allowed(&domain) {
            return None;
        }
        Some(format!("{local}@{domain}"))
    }

    fn domain_allowed(&self, domain: &str) -> bool {
        self.allowlist.iter().any(|suffix| {
            domain == suffix || domain.ends_with(&format!(".{suffix}"))
        })
    }

    /// Recovers addresses from Joomla-style cloaking scripts: a chain of
    /// `addy…`/`addy_text…` variables built by string concatenation.
    fn uncloak_script(&self, script: &str) -> Vec<String> {
        if !script.contains("cloak") && !script.contains("addy") {
            return Vec::new();
        }

        let mut variables: Vec<(String, String)> = Vec::new();
        let mut found = Vec::new();
        for statement in split_js_statements(script) {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let Some(captures) = self.addy_re.captures(statement) else {
                continue;
            };
            let name = captures[1].to_string();
            let value = self.eval_js_concat(&captures[2], &variables);
            if value.is_empty() {
                continue;
            }
            if value.contains('@') {
                found.push(value.clone());
            }
            variables.retain(|(n, _)| n != &name);
            variables.push((name, value));
        }
        found
    }

    /// Evaluates a concatenation of string literals and known variables.
    fn eval_js_concat(&self, expr: &str, variables: &[(String, String)]) -> String {
        let mut out = String::new();
        for captures in self.js_token_re.captures_iter(expr) {
            if let Some(literal) = captures.get(1).or_else(|| captures.get(2)) {
                let unescaped = literal.as_str().replace("\\'", "'").replace("\\\\", "\\");
                out.push_str(&decode_entities(&unescaped));
            } else if let Some(ident) = captures.get(3) {
                if let Some((_, value)) = variables.iter().find(|(n, _)| n == ident.as_str()) {
                    out.push_str(value);
                }
            }
        }
        out
    }
}

/// Applies the fixed cloak replacements to free text.
fn uncloak(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in CLOAK_AT {
        out = out.replace(pattern, "@");
    }
    for pattern in CLOAK_DOT {
        out = out.replace(pattern, ".");
    }
    out
}

/// Splits a candidate into (local, domain) iff it is a plain RFC-5322
/// addr-spec: dot-atom local part (no comments, no quoted strings) and a
/// dotted domain of LDH labels ending in an alphabetic TLD.
fn split_addr_spec(value: &str) -> Option<(&str, &str)> {
    let (local, domain) = value.split_once('@')?;
    if domain.contains('@') {
        return None;
    }

    if local.is_empty() || local.len() > 64 {
        return None;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return None;
    }
    let atext = |c: char| {
        c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c)
    };
    if !local.chars().all(atext) {
        return None;
    }

    if domain.is_empty() || domain.len() > 255 || !domain.contains('.') {
        return None;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return None;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return None;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
    }
    let tld = labels.last()?;
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((local, domain))
}

/// Splits JavaScript source on `;`, ignoring semicolons inside strings.
fn split_js_statements(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buffer = String::new();
    let mut in_string = false;
    let mut escape = false;
    let mut quote = ' ';

    for ch in text.chars() {
        if in_string {
            buffer.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == quote {
                in_string = false;
            }
        } else if ch == '\'' || ch == '"' {
            in_string = true;
            quote = ch;
            buffer.push(ch);
        } else if ch == ';' {
            parts.push(std::mem::take(&mut buffer));
        } else {
            buffer.push(ch);
        }
    }
    if !buffer.is_empty() {
        parts.push(buffer);
    }
    parts
}

/// Decodes numeric character references and the handful of named entities
/// cloaking scripts actually use.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}
