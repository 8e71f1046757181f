use crate::config::types::{ConfigOverrides, CrawlConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads the effective configuration.
///
/// Precedence, highest first: `overrides`, `PARSER_*` environment
/// variables, the config file (`file_path` or `PARSER_CONFIG_FILE`),
/// built-in defaults. The merged result is validated before it is returned.
pub fn load_config(
    file_path: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<CrawlConfig, ConfigError> {
    let mut config = CrawlConfig::default();

    let env_file = std::env::var("PARSER_CONFIG_FILE").ok();
    let effective_path = file_path
        .map(Path::to_path_buf)
        .or_else(|| env_file.map(std::path::PathBuf::from));

    if let Some(path) = effective_path {
        read_config_file(&path)?.apply(&mut config);
    }

    overrides_from_env()?.apply(&mut config);

    if let Some(explicit) = overrides {
        explicit.apply(&mut config);
    }

    validate(&config)?;
    Ok(config)
}

/// Parses a TOML or JSON config file into a partial config.
///
/// TOML files may nest the fields under a `[parser]` table.
pub fn read_config_file(path: &Path) -> Result<ConfigOverrides, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let value: toml::Value = toml::from_str(&content)?;
            let table = match value.get("parser") {
                Some(parser) => parser.clone(),
                None => value,
            };
            Ok(table.try_into()?)
        }
        Some("json") => Ok(serde_json::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Reads `PARSER_*` environment variables into a partial config.
fn overrides_from_env() -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides::default();

    overrides.max_seconds = env_parse("PARSER_MAX_SECONDS")?;
    overrides.max_depth = env_parse("PARSER_MAX_DEPTH")?;
    overrides.max_pages = env_parse("PARSER_MAX_PAGES")?;
    overrides.max_links_per_page = env_parse("PARSER_MAX_LINKS_PER_PAGE")?;
    overrides.max_body_bytes = env_parse("PARSER_MAX_BODY_BYTES")?;
    overrides.max_concurrency = env_parse("PARSER_MAX_CONCURRENCY")?;
    overrides.request_timeout = env_parse("PARSER_REQUEST_TIMEOUT")?;
    overrides.retry_total = env_parse("PARSER_RETRY_TOTAL")?;
    overrides.retry_backoff_factor = env_parse("PARSER_RETRY_BACKOFF_FACTOR")?;
    overrides.focused_crawling = env_bool("PARSER_FOCUSED_CRAWLING")?;
    overrides.include_query = env_bool("PARSER_INCLUDE_QUERY")?;
    overrides.user_agent = env_string("PARSER_USER_AGENT");
    overrides.phone_regions = env_string("PARSER_PHONE_REGIONS").map(|s| vec![s]);
    overrides.email_domain_allowlist =
        env_string("PARSER_EMAIL_DOMAIN_ALLOWLIST").map(|s| vec![s]);

    Ok(overrides)
}

fn env_string(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("{e}"),
        }),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "n" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                field: name.to_string(),
                message: format!("invalid boolean value: {raw:?}"),
            }),
        },
    }
}
