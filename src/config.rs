use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND: &str = "0.0.0.0:3152";
const DEFAULT_LANGUAGE: &str = "ru-RU";
const DEFAULT_SCAN_BUDGET: usize = 5;

/// Everything the process reads from the environment, resolved once at
/// startup. The TMDB key stays optional: without it the service still serves
/// the local catalog and reports remote lookups as not configured.
#[derive(Debug, Clone)]
pub struct Config {
    pub works_csv: PathBuf,
    pub performers_csv: PathBuf,
    pub bind: SocketAddr,
    pub tmdb_api_key: Option<String>,
    pub tmdb_language: String,
    pub allowed_companies: Vec<i64>,
    pub scan_budget: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let works_csv = env::var("CATALOG_WORKS_CSV")
            .unwrap_or_else(|_| "data/works.csv".to_string())
            .into();
        let performers_csv = env::var("CATALOG_PERFORMERS_CSV")
            .unwrap_or_else(|_| "data/performers.csv".to_string())
            .into();
        let bind = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR is not a valid socket address")?;
        let tmdb_api_key = env::var("TMDB_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let tmdb_language =
            env::var("TMDB_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());
        let allowed_companies = match env::var("TMDB_COMPANY_ALLOWLIST") {
            Ok(raw) => parse_id_list(&raw).context("TMDB_COMPANY_ALLOWLIST must be comma-separated integer ids")?,
            Err(_) => Vec::new(),
        };
        let scan_budget = match env::var("TMDB_SCAN_BUDGET") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .context("TMDB_SCAN_BUDGET must be a positive integer")?,
            Err(_) => DEFAULT_SCAN_BUDGET,
        };

        Ok(Self {
            works_csv,
            performers_csv,
            bind,
            tmdb_api_key,
            tmdb_language,
            allowed_companies,
            scan_budget,
        })
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            piece
                .parse::<i64>()
                .with_context(|| format!("invalid company id '{piece}'"))
        })
        .collect()
}
