use crate::config::types::CrawlConfig;
use crate::ConfigError;

/// Bounds applied to a merged configuration before a crawl may start.
///
/// The ranges match what the HTTP API accepts for overrides, so a config
/// rejected here is rejected identically at every entry point.
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    check_range_f64("max_seconds", config.max_seconds, 0.0, 3600.0)?;
    check_range("max_depth", config.max_depth as i64, 0, 50)?;
    check_range("max_pages", config.max_pages as i64, 1, 5000)?;
    check_range("max_links_per_page", config.max_links_per_page as i64, 1, 5000)?;
    check_range("max_body_bytes", config.max_body_bytes as i64, 1, 50_000_000)?;
    check_range("max_concurrency", config.max_concurrency as i64, 1, 64)?;
    check_range_f64("request_timeout", config.request_timeout, 0.1, 120.0)?;
    check_range("retry_total", config.retry_total as i64, 0, 10)?;
    check_range_f64("retry_backoff_factor", config.retry_backoff_factor, 0.0, 10.0)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent must not be empty".to_string(),
        ));
    }
    if config.user_agent.len() > 512 {
        return Err(ConfigError::Validation(
            "user_agent is too long".to_string(),
        ));
    }

    for region in &config.phone_regions {
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "phone region must be an ISO-3166-1 alpha-2 code, got {region:?}"
            )));
        }
    }

    for suffix in &config.email_domain_allowlist {
        if suffix.is_empty() || suffix.contains('@') || suffix.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "invalid email domain suffix: {suffix:?}"
            )));
        }
    }

    Ok(())
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

fn check_range_f64(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}
