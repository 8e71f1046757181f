//! site-scout command-line interface
//!
//! One-shot mode crawls a site and prints the JSON result; `--serve` runs
//! the HTTP API instead.

use clap::Parser;
use site_scout::config::load_config;
use site_scout::crawler::parse_site_async;
use site_scout::{server, ScoutError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Harvest contact e-mails and phone numbers from a website
#[derive(Parser, Debug)]
#[command(name = "site-scout", version)]
struct Cli {
    /// Start URL; the crawl stays within its registered domain
    #[arg(value_name = "START_URL", required_unless_present = "serve")]
    start_url: Option<String>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,

    /// Path to a TOML or JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level: DEBUG, INFO, WARNING or ERROR
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Run the HTTP API instead of a one-shot crawl; ADDR defaults to
    /// PARSER_API_HOST:PARSER_API_PORT or 127.0.0.1:8000
    #[arg(
        long,
        value_name = "ADDR",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "start_url"
    )]
    serve: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    let config = match load_config(cli.config.as_deref(), None) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("configuration error: {error}");
            return ExitCode::from(2);
        }
    };

    if let Some(serve) = cli.serve {
        let addr = resolve_serve_addr(&serve);
        return match server::serve(&addr).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                tracing::error!("server failed: {error}");
                ExitCode::from(1)
            }
        };
    }

    let Some(start_url) = cli.start_url else {
        // clap guarantees start_url when --serve is absent
        return ExitCode::from(2);
    };

    match parse_site_async(&start_url, &config).await {
        Ok(result) => {
            let json = if cli.pretty {
                serde_json::to_string_pretty(&result)
            } else {
                serde_json::to_string(&result)
            };
            match json {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(error) => {
                    tracing::error!("failed to serialise result: {error}");
                    ExitCode::from(1)
                }
            }
        }
        Err(error @ ScoutError::InvalidUrl(_)) => {
            tracing::error!("{error}");
            ExitCode::from(1)
        }
        Err(error) => {
            tracing::error!("crawl failed: {error}");
            ExitCode::from(1)
        }
    }
}

/// Maps the CLI/env log level onto an EnvFilter directive.
fn setup_logging(cli_level: Option<&str>) {
    let level = cli_level
        .map(str::to_string)
        .or_else(|| std::env::var("PARSER_LOG_LEVEL").ok())
        .unwrap_or_else(|| "INFO".to_string());

    let directive = match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => "site_scout=debug,info",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "site_scout=info,warn",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_serve_addr(cli_value: &str) -> String {
    if !cli_value.is_empty() {
        return cli_value.to_string();
    }
    let host = std::env::var("PARSER_API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PARSER_API_PORT").unwrap_or_else(|_| "8000".to_string());
    format!("{host}:{port}")
}
