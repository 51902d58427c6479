use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::models::TotalRowHints;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_cache_capacity() -> u64 {
    64
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub cache_capacity: u64,
    pub total_rows: TotalRowHints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            cache_capacity: default_cache_capacity(),
            total_rows: TotalRowHints::default(),
        }
    }
}

impl Config {
    /// Builds the config from a variable lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let hints = defaults.total_rows;

        Ok(Config {
            bind_addr: parse_var(&lookup, "CENSUS_BIND_ADDR", defaults.bind_addr)?,
            max_file_size: parse_var(&lookup, "CENSUS_MAX_FILE_SIZE", defaults.max_file_size)?,
            cache_capacity: parse_var(&lookup, "CENSUS_CACHE_CAPACITY", defaults.cache_capacity)?,
            total_rows: TotalRowHints {
                opd_time: parse_var(&lookup, "CENSUS_TOTAL_ROW_OPD_TIME", hints.opd_time)?,
                opd_special: parse_var(&lookup, "CENSUS_TOTAL_ROW_OPD_SPECIAL", hints.opd_special)?,
                opd_premium: parse_var(&lookup, "CENSUS_TOTAL_ROW_OPD_PREMIUM", hints.opd_premium)?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    // Load .env file first
    dotenv().ok();

    let config = Config::from_lookup(|key| std::env::var(key).ok())?;
    tracing::info!("Loaded configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.total_rows, TotalRowHints::default());
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CENSUS_BIND_ADDR", "0.0.0.0:8080"),
            ("CENSUS_TOTAL_ROW_OPD_TIME", "52"),
            ("CENSUS_CACHE_CAPACITY", " 8 "),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.total_rows.opd_time, 52);
        assert_eq!(config.total_rows.opd_special, 20);
        assert_eq!(config.cache_capacity, 8);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let result = Config::from_lookup(|key| {
            (key == "CENSUS_MAX_FILE_SIZE").then(|| "ten".to_string())
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("CENSUS_MAX_FILE_SIZE"));
    }
}
