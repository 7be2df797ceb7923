// src/config.rs

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::path::{Path, PathBuf};
use url::Url;

// Default base of the public API, used to build self links of matched entities
pub const DEFAULT_API_BASE_URL: &str = "https://api.gbif.org/v1/";

// Environment variables read by MatcherConfig::from_env
pub const API_BASE_URL_ENV_VAR: &str = "GRSCICOLL_API_BASE_URL";
pub const SNAPSHOT_ENV_VAR: &str = "REGISTRY_SNAPSHOT";

/// Settings shared by the matchers and the binaries.
///
/// Built once at start-up and handed around by reference; nothing in the
/// crate reads configuration from a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Base URL of the API, always ending with a slash.
    pub api_base_url: String,
    /// Registry snapshot used by the in-memory store, if configured.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            snapshot_path: None,
        }
    }
}

impl MatcherConfig {
    /// Validates `api_base_url` as an http(s) URL and normalises it to end
    /// with a slash.
    pub fn new(api_base_url: &str) -> Result<Self> {
        let parsed = Url::parse(api_base_url.trim())
            .with_context(|| format!("Invalid API base URL: {}", api_base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "API base URL must be http or https, got {}",
                parsed.scheme()
            ));
        }
        let mut api_base_url = parsed.to_string();
        if !api_base_url.ends_with('/') {
            api_base_url.push('/');
        }
        Ok(Self {
            api_base_url,
            snapshot_path: None,
        })
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(API_BASE_URL_ENV_VAR) {
            Ok(url) => Self::new(&url)?,
            Err(_) => Self::default(),
        };
        if let Ok(path) = std::env::var(SNAPSHOT_ENV_VAR) {
            if !path.trim().is_empty() {
                config.snapshot_path = Some(PathBuf::from(path.trim()));
            }
        }
        info!(
            "Matcher config: api_base_url={}, snapshot={:?}",
            config.api_base_url, config.snapshot_path
        );
        Ok(config)
    }
}

/// Loads the nearest `.env` file (current directory or a parent) into the
/// environment. Variables that are already set are left alone.
///
/// Must run before any thread is spawned, the async runtime included.
pub fn load_env() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => {
            info!("Loaded environment variables from {}", path.display());
            Some(path)
        }
        Err(e) => {
            info!("No .env file loaded ({}), using environment variables from system", e);
            None
        }
    }
}

/// Loads a specific env file. Same rules as [`load_env`].
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenv::from_path(path)
        .with_context(|| format!("Failed to load env file {}", path.display()))?;
    debug!("Loaded environment variables from {}", path.display());
    Ok(())
}
