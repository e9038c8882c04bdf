use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::fetch::{
    CatalogUrls, DEFAULT_DETAIL_URL, DEFAULT_IMAGE_URL, DEFAULT_LANGUAGE_URL, RetryPolicy,
};
use crate::partition::DEFAULT_BATCH_SIZE;
use crate::pipeline::DEFAULT_CHANNEL_CAPACITY;

pub const DEFAULT_CONFIG_FILE: &str = "gatherer-ingest.json";
pub const DEFAULT_MAX_IDENTIFIER: u32 = 500_000;

/// On-disk form; every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub language_url: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub channel_capacity: Option<usize>,
    #[serde(default)]
    pub max_identifier: Option<u32>,
    #[serde(default)]
    pub store_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub urls: CatalogUrls,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub channel_capacity: usize,
    pub max_identifier: u32,
    /// `None` means the per-user data directory.
    pub store_dir: Option<Utf8PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            urls: CatalogUrls::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_identifier: DEFAULT_MAX_IDENTIFIER,
            store_dir: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `gatherer-ingest.json` when it exists. Without either the
    /// defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<IngestConfig, IngestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| IngestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IngestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<IngestConfig, IngestError> {
        let batch_size = at_least_one(config.batch_size, DEFAULT_BATCH_SIZE, "batch_size")?;
        let max_attempts = at_least_one(config.max_attempts, 5, "max_attempts")?;
        let channel_capacity = at_least_one(
            config.channel_capacity,
            DEFAULT_CHANNEL_CAPACITY,
            "channel_capacity",
        )?;
        let max_identifier = at_least_one(
            config.max_identifier,
            DEFAULT_MAX_IDENTIFIER,
            "max_identifier",
        )?;

        Ok(IngestConfig {
            urls: CatalogUrls {
                detail: config
                    .detail_url
                    .unwrap_or_else(|| DEFAULT_DETAIL_URL.to_string()),
                image: config
                    .image_url
                    .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
                language: config
                    .language_url
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_URL.to_string()),
            },
            batch_size,
            retry: RetryPolicy {
                max_attempts,
                delay: Duration::from_secs(config.retry_delay_secs.unwrap_or(10)),
            },
            request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(60)),
            channel_capacity,
            max_identifier,
            store_dir: config.store_dir,
        })
    }
}

fn at_least_one<T>(value: Option<T>, default: T, field: &str) -> Result<T, IngestError>
where
    T: PartialOrd + From<u8>,
{
    let value = value.unwrap_or(default);
    if value < T::from(1) {
        return Err(IngestError::ConfigInvalid(format!("{field} must be at least 1")));
    }
    Ok(value)
}
