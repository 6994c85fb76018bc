//! Process configuration.
//!
//! Read once at startup from environment variables and passed by
//! reference into the constructors that need it.

use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::normalize::normalize;

const ENV_API_KEY: &str = "CAFE_PLACE_API_KEY";
const ENV_CATALOG_PATH: &str = "CAFE_CATALOG_PATH";
const ENV_CACHE_PATH: &str = "CAFE_CACHE_PATH";
const ENV_LANGUAGE: &str = "CAFE_LANGUAGE";
const ENV_LIMIT_TO: &str = "CAFE_LIMIT_TO";
const ENV_CALL_BUDGET: &str = "CAFE_CALL_BUDGET";
const ENV_MAX_CONCURRENT: &str = "CAFE_MAX_CONCURRENT";
const ENV_RETRY_ATTEMPTS: &str = "CAFE_RETRY_ATTEMPTS";
const ENV_BIND_ADDR: &str = "CAFE_BIND_ADDR";

/// Errors that make the process unable to start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Everything the service needs to know at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub catalog_path: PathBuf,
    pub cache_path: PathBuf,
    pub language: String,
    /// Allow-list of normalized store names. When set, only these stores
    /// are looked up (the limited / dry-run mode).
    pub limit_to: Option<BTreeSet<String>>,
    pub call_budget: Option<usize>,
    pub max_concurrent: usize,
    pub retry_attempts: u32,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY).ok_or(ConfigError::Missing(ENV_API_KEY))?;

        let limit_to = get(ENV_LIMIT_TO).map(|list| {
            list.split(',')
                .map(normalize)
                .filter(|name| !name.is_empty())
                .collect::<BTreeSet<_>>()
        });

        Ok(Self {
            api_key,
            catalog_path: get(ENV_CATALOG_PATH)
                .unwrap_or_else(|| "data/cafe_nomad.json".to_string())
                .into(),
            cache_path: get(ENV_CACHE_PATH)
                .unwrap_or_else(|| "data/place_cache.json".to_string())
                .into(),
            language: get(ENV_LANGUAGE).unwrap_or_else(|| "zh-TW".to_string()),
            limit_to,
            call_budget: get(ENV_CALL_BUDGET)
                .map(|v| parse_number(ENV_CALL_BUDGET, &v))
                .transpose()?,
            max_concurrent: get(ENV_MAX_CONCURRENT)
                .map(|v| parse_positive(ENV_MAX_CONCURRENT, &v))
                .transpose()?
                .unwrap_or(1),
            retry_attempts: get(ENV_RETRY_ATTEMPTS)
                .map(|v| parse_positive(ENV_RETRY_ATTEMPTS, &v))
                .transpose()?
                .unwrap_or(1),
            bind_addr: get(ENV_BIND_ADDR)
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::Invalid {
                        name: ENV_BIND_ADDR,
                        value: v.clone(),
                        reason: "expected host:port",
                    })
                })
                .transpose()?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000))),
        })
    }
}

fn parse_number<N: std::str::FromStr>(name: &'static str, value: &str) -> Result<N, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}

fn parse_positive<N>(name: &'static str, value: &str) -> Result<N, ConfigError>
where
    N: std::str::FromStr + PartialOrd + From<u8>,
{
    let n: N = parse_number(name, value)?;
    if n < N::from(1) {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "must be at least 1",
        });
    }
    Ok(n)
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("catalog_path", &self.catalog_path)
            .field("cache_path", &self.cache_path)
            .field("language", &self.language)
            .field("limit_to", &self.limit_to)
            .field("call_budget", &self.call_budget)
            .field("max_concurrent", &self.max_concurrent)
            .field("retry_attempts", &self.retry_attempts)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}
