use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wiktionary_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, MAX_SUGGESTIONS};

use crate::{render::DEFAULT_LANGUAGE, suggest::SessionOptions};

pub const ENV_PREFIX: &str = "WIKTIONARY";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_ICON: &str = "assets/icon.svg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Language section of the definition payload to render.
    pub language: String,
    pub base_url: String,
    pub user_agent: String,
    pub suggestion_limit: usize,
    pub debounce_ms: u64,
    pub min_request_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub default_icon: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            suggestion_limit: MAX_SUGGESTIONS,
            debounce_ms: 250,
            min_request_interval_ms: 250,
            request_timeout_secs: 15,
            default_icon: DEFAULT_ICON.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then `WIKTIONARY_*` variables.
    ///
    /// An explicit `path` must exist; the per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, ENV_PREFIX)
    }

    pub fn load_with_env(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let defaults =
            Config::try_from(&Settings::default()).context("failed to encode default settings")?;
        let mut builder = Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    debug!(path = %path.display(), "looking for user config file");
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()
            .context("failed to load settings")?
            .try_deserialize()
            .context("invalid settings")?;
        Ok(settings.normalized())
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.language = self.language.trim().to_string();
        if self.language.is_empty() {
            self.language = DEFAULT_LANGUAGE.to_string();
        }
        self.suggestion_limit = self.suggestion_limit.clamp(1, MAX_SUGGESTIONS);
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            min_interval: Duration::from_millis(self.min_request_interval_ms),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "Wiktionary", "wiktionary-lookup")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
