use crate::core::errors::AsinCacheError;
use crate::core::models::Asin;
use crate::core::services::read_through::DEFAULT_TTL;
use crate::infrastructure::fetcher::serpapi::DEFAULT_BASE_URL;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AsinCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AsinCacheError::InvalidConfig(
                "BLOB_STORE_BACKEND".to_string(),
                format!("expected `file` or `memory`, got `{}`", other),
            )),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub serpapi_key: String,
    pub serpapi_base_url: String,
    pub upstream_timeout: Duration,
    pub store_backend: StoreBackend,
    pub store_root: PathBuf,
    pub store_namespace: String,
    pub cache_ttl: Duration,
    pub cache_degraded: bool,
    pub tracked_asins: Vec<Asin>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("serpapi_key", &"<redacted>")
            .field("serpapi_base_url", &self.serpapi_base_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("store_backend", &self.store_backend)
            .field("store_root", &self.store_root)
            .field("store_namespace", &self.store_namespace)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_degraded", &self.cache_degraded)
            .field("tracked_asins", &self.tracked_asins)
            .finish()
    }
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, AsinCacheError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AsinCacheError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &str| var(name).ok_or_else(|| AsinCacheError::MissingConfig(name.to_string()));

        Ok(Self {
            port: parse_or(var("PORT"), "PORT", 3000)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            serpapi_key: required("SERPAPI_KEY")?,
            serpapi_base_url: var("SERPAPI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            upstream_timeout: Duration::from_secs(parse_or(var("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS", 20)?),
            store_backend: var("BLOB_STORE_BACKEND")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(StoreBackend::File),
            store_root: var("BLOB_STORE_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".blobs")),
            store_namespace: required("BLOB_STORE_NAMESPACE")?,
            cache_ttl: Duration::from_secs(parse_or(var("CACHE_TTL_SECS"), "CACHE_TTL_SECS", DEFAULT_TTL.as_secs())?),
            cache_degraded: parse_or(var("CACHE_DEGRADED_RECORDS"), "CACHE_DEGRADED_RECORDS", false)?,
            tracked_asins: var("TRACKED_ASINS")
                .map(|v| Asin::parse_list(&v))
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T, AsinCacheError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| AsinCacheError::InvalidConfig(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
