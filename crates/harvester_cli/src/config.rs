//! Run configuration, read once at startup from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use search_harvester::{DelayPolicySettings, FetchSettings, RetryPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "harvest.ron";
pub const API_KEY_ENV: &str = "SEARCH_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub filter: String,
    pub sentinel_author: String,
    pub output_dir: PathBuf,
    pub csv_stem: String,
    pub secondary_label: String,
    pub page_dir: Option<PathBuf>,
    pub page_prefix: String,
    pub delay: DelayPolicySettings,
    pub retry: RetryPolicy,
    pub retry_failed_pages: bool,
    pub max_pages: Option<u32>,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            filter: "kicker:(%22Modern Love%22)".to_string(),
            sentinel_author: "Modern Love Podcast".to_string(),
            output_dir: PathBuf::from("output"),
            csv_stem: "modern_love".to_string(),
            secondary_label: "podcast".to_string(),
            page_dir: None,
            page_prefix: "page".to_string(),
            delay: DelayPolicySettings::default(),
            retry: RetryPolicy::default(),
            retry_failed_pages: false,
            max_pages: None,
            request_timeout_secs: 30,
            log_file: None,
        }
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = ron::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Like [`CliConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The environment variable wins over the file.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> anyhow::Result<String> {
        let key = env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()));
        match key {
            Some(key) => Ok(key),
            None => bail!("no api key: set {API_KEY_ENV} or `api_key` in the config file"),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..FetchSettings::default()
        }
    }
}
