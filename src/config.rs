use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::KeggError;

pub const CONFIG_FILE_NAME: &str = "kegg-harvest.json";
pub const DEFAULT_API_BASE: &str = "https://rest.kegg.jp";
pub const DEFAULT_WEB_BASE: &str = "https://www.genome.jp";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub web_base: Option<String>,
    #[serde(default)]
    pub out_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub batch: BatchEntry,
    #[serde(default)]
    pub retry: RetryEntry,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub query_size: Option<usize>,
    #[serde(default)]
    pub group_size: Option<usize>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub pause_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_attempts: Option<usize>,
    #[serde(default)]
    pub delay_secs: Option<u64>,
}

/// How identifier batches are cut and dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Ids joined into one `get` request.
    pub query_size: usize,
    /// Requests dispatched together on the worker pool.
    pub group_size: usize,
    pub workers: usize,
    /// Sleep between groups.
    pub pause: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            query_size: 10,
            group_size: 20,
            workers: 20,
            pause: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base: String,
    pub web_base: String,
    pub out_dir: Utf8PathBuf,
    pub timeout: Duration,
    pub batch: BatchSettings,
    pub retry: RetryPolicy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            out_dir: Utf8PathBuf::from("kegg_data"),
            timeout: Duration::from_secs(60),
            batch: BatchSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads an explicit config path, or the first `kegg-harvest.json` found in
    /// the working directory or the user config directory. No file means defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KeggError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KeggError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KeggError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded configuration");

        Self::resolve_config(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "kegg-harvest")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KeggError> {
        let defaults = ResolvedConfig::default();

        let batch = BatchSettings {
            query_size: non_zero("batch.query_size", config.batch.query_size)?
                .unwrap_or(defaults.batch.query_size),
            group_size: non_zero("batch.group_size", config.batch.group_size)?
                .unwrap_or(defaults.batch.group_size),
            workers: non_zero("batch.workers", config.batch.workers)?
                .unwrap_or(defaults.batch.workers),
            pause: config
                .batch
                .pause_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.batch.pause),
        };
        let retry = RetryPolicy {
            max_attempts: non_zero("retry.max_attempts", config.retry.max_attempts)?
                .unwrap_or(defaults.retry.max_attempts),
            delay: config
                .retry
                .delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.delay),
        };

        Ok(ResolvedConfig {
            api_base: config
                .api_base
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            web_base: config
                .web_base
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.web_base),
            out_dir: config.out_dir.map(Utf8PathBuf::from).unwrap_or(defaults.out_dir),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            batch,
            retry,
        })
    }
}

fn non_zero(field: &str, value: Option<usize>) -> Result<Option<usize>, KeggError> {
    match value {
        Some(0) => Err(KeggError::InvalidConfig(format!("{field} must be at least 1"))),
        other => Ok(other),
    }
}
