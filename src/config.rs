//! Configuration for plarchive.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PLARCHIVE_HOME, PLARCHIVE_ARCHIVES, PLARCHIVE_API_KEY)
//! 2. Config file (.plarchive/config.yaml)
//! 3. Defaults (~/.plarchive)
//!
//! Config file discovery:
//! - Searches current directory and parents for .plarchive/config.yaml
//! - Paths in config file are relative to the project root (the parent of .plarchive/)
//!
//! The resolved configuration is loaded once by the CLI and passed down.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::youtube::{DEFAULT_BASE_URL, MAX_RESULTS};
use crate::adapters::{RetryPolicy, YouTubeConfig};
use crate::cache::{UrlCache, DEFAULT_MAX_AGE};
use crate::history::History;
use crate::storage::{StorageBackend, StoreSettings, UpsertField};

const CONFIG_DIR: &str = ".plarchive";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_KEY_FILE: &str = "key";
const DEFAULT_CONCURRENCY: usize = 10;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub fetch: Option<FetchConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (history, cache)
    pub home: Option<String>,
    /// Archive directory
    pub archives: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// File whose first line is the API key
    pub key_file: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub concurrency: Option<usize>,
    pub max_results: Option<u32>,
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<StorageBackend>,
    pub upsert_field: Option<UpsertField>,
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub archives: Option<String>,
    pub api_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            home: std::env::var("PLARCHIVE_HOME").ok(),
            archives: std::env::var("PLARCHIVE_ARCHIVES").ok(),
            api_key: std::env::var("PLARCHIVE_API_KEY").ok(),
        }
    }
}

/// Network settings
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub concurrency: usize,
    pub max_results: u32,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_results: MAX_RESULTS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory (history, cache)
    pub home: PathBuf,
    /// Archive directory
    pub archives: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// API key from the environment, if set
    pub api_key: Option<String>,
    /// File holding the API key
    pub key_file: PathBuf,
    pub base_url: String,
    pub fetch: FetchSettings,
    pub cache_max_age: Duration,
    pub backend: StorageBackend,
    pub upsert_field: UpsertField,
}

impl ResolvedConfig {
    /// API key from the environment or the first line of the key file
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        let content = std::fs::read_to_string(&self.key_file).with_context(|| {
            format!(
                "Failed to read API key file: {} (or set PLARCHIVE_API_KEY)",
                self.key_file.display()
            )
        })?;

        let key = content.lines().next().unwrap_or_default().trim();
        if key.is_empty() {
            anyhow::bail!("API key file is empty: {}", self.key_file.display());
        }

        Ok(key.to_string())
    }

    /// Client configuration for the YouTube API
    pub fn youtube_config(&self) -> Result<YouTubeConfig> {
        Ok(YouTubeConfig {
            api_key: self.api_key()?,
            base_url: self.base_url.clone(),
            max_results: self.fetch.max_results,
            concurrency: self.fetch.concurrency,
            retry: self.fetch.retry.clone(),
        })
    }

    /// Storage settings, optionally overriding the backend
    pub fn store_settings(&self, backend: Option<StorageBackend>) -> StoreSettings {
        StoreSettings {
            backend: backend.unwrap_or(self.backend),
            archives_dir: self.archives.clone(),
            upsert_field: self.upsert_field,
        }
    }

    /// Cache directory ($PLARCHIVE_HOME/cache)
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn url_cache(&self) -> UrlCache {
        UrlCache::new(self.cache_dir(), self.cache_max_age)
    }

    /// Run history ($PLARCHIVE_HOME/history.jsonl)
    pub fn history_path(&self) -> PathBuf {
        self.home.join("history.jsonl")
    }

    pub fn history(&self) -> History {
        History::new(self.history_path())
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Combine file values, environment overrides and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), config),
        None => (None, ConfigFile::default()),
    };

    // Project root is the parent of .plarchive/
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let home = if let Some(env_home) = env.home {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = config.paths.home {
        resolve_path(&base_dir, home_path)
    } else {
        default_home
    };

    let archives = if let Some(env_archives) = env.archives {
        PathBuf::from(env_archives)
    } else if let Some(ref archives_path) = config.paths.archives {
        resolve_path(&base_dir, archives_path)
    } else {
        home.join("archives")
    };

    let key_file = config
        .api
        .as_ref()
        .and_then(|a| a.key_file.as_deref())
        .map(|p| resolve_path(&base_dir, p))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILE));

    let base_url = config
        .api
        .as_ref()
        .and_then(|a| a.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let defaults = FetchSettings::default();
    let fetch = match config.fetch {
        Some(fetch) => FetchSettings {
            concurrency: fetch.concurrency.unwrap_or(defaults.concurrency),
            max_results: fetch.max_results.unwrap_or(defaults.max_results),
            retry: fetch.retry.unwrap_or(defaults.retry),
        },
        None => defaults,
    };

    let cache_max_age = config
        .cache
        .as_ref()
        .and_then(|c| c.max_age_seconds)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_MAX_AGE);

    let backend = config
        .storage
        .as_ref()
        .and_then(|s| s.backend)
        .unwrap_or_default();
    let upsert_field = config
        .storage
        .as_ref()
        .and_then(|s| s.upsert_field)
        .unwrap_or_default();

    ResolvedConfig {
        home,
        archives,
        config_file,
        api_key: env.api_key,
        key_file,
        base_url,
        fetch,
        cache_max_age,
        backend,
        upsert_field,
    }
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let file = match find_config_file(&cwd) {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(file, EnvOverrides::from_env(), default_home))
}
