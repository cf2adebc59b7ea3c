//! Application configuration loaded from a RON file.
//!
//! Every field has a default except the service URL, which must come from the
//! file or from `CIRCULAR_CHAT_API_URL`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use circular_client::{
    ClientSettings, QueryOptions, DEFAULT_MAX_RESULTS, DEFAULT_POLL_INTERVAL, DEFAULT_THRESHOLD,
};
use circular_logging::chat_warn;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "circular_chat.ron";
pub const API_URL_ENV: &str = "CIRCULAR_CHAT_API_URL";
/// Shorter poll intervals from the config file are raised to this.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: Option<String>,
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub max_results: u32,
    pub threshold: f64,
    pub log_to_terminal: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            data_dir: PathBuf::from("circular_chat_data"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_secs: 30,
            max_results: DEFAULT_MAX_RESULTS,
            threshold: DEFAULT_THRESHOLD,
            log_to_terminal: false,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or the default file in the working directory when no
    /// path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILENAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
    }

    pub fn client_settings(&self) -> anyhow::Result<ClientSettings> {
        let Some(base_url) = self.api_base_url.as_deref() else {
            bail!("no service URL configured; set api_base_url or {API_URL_ENV}");
        };
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            chat_warn!(
                "poll_interval_ms={} is below the minimum; using {}",
                self.poll_interval_ms,
                MIN_POLL_INTERVAL_MS
            );
        }
        Ok(ClientSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientSettings::new(base_url)
        })
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_results: Some(self.max_results),
            threshold: Some(self.threshold),
        }
    }
}
