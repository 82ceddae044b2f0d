//! Configuration loaded from `$XDG_CONFIG_HOME/homeflix/config.toml`.
//!
//! Every key is optional. Credentials may also come from the environment,
//! which wins over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::extractor::StrategyKind;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub premiumize: PremiumizeConfig,
    pub tmdb: TmdbConfig,
    pub trakt: TraktConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub strategy: StrategyKind,
    /// Secondary pages the post-pages strategy follows at most.
    pub max_posts: usize,
    pub post_selector: String,
    /// Substring a post link's href must contain to be followed.
    pub post_path_marker: String,
    pub proxy: Option<ProxyConfig>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strategy: StrategyKind::Flat,
            max_posts: 3,
            post_selector: "h2 a".to_string(),
            post_path_marker: "/download/".to_string(),
            proxy: None,
        }
    }
}

/// JS-rendering scraping proxy. Pages are fetched through it when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub api_key: String,
    #[serde(default = "default_true")]
    pub render_js: bool,
    #[serde(default = "default_proxy_url")]
    pub base_url: String,
}

fn default_true() -> bool {
    true
}

fn default_proxy_url() -> String {
    "https://app.scrapingbee.com/api/v1/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumizeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for PremiumizeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.premiumize.me/api".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraktConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: "https://api.trakt.tv".to_string(),
        }
    }
}

/// Content-indexing sites searched for download links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub movie_search: String,
    pub episode_search: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            movie_search: "https://oneddl.net/search/".to_string(),
            episode_search: "https://sanet.st/search/".to_string(),
        }
    }
}

/// Location of an existing config file, if there is one.
pub fn config_path() -> Result<Option<PathBuf>, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("homeflix")?;
    Ok(xdg_dirs.find_config_file("config.toml"))
}

impl Config {
    /// Reads the config file if it exists, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path()? {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::from_path(&path)?
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlays credentials found through `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("TMDB_API") {
            self.tmdb.api_key = Some(key);
        }
        if let Some(id) = non_empty("CLIENT_ID") {
            self.trakt.client_id = Some(id);
        }
        if let Some(secret) = non_empty("CLIENT_SECRET") {
            self.trakt.client_secret = Some(secret);
        }
        if let Some(key) = non_empty("PREMIUMIZE_API_KEY") {
            self.premiumize.api_key = Some(key);
        }
        if let Some(key) = non_empty("SCRAPINGBEE_API_KEY") {
            match self.scraper.proxy.as_mut() {
                Some(proxy) => proxy.api_key = key,
                None => {
                    self.scraper.proxy = Some(ProxyConfig {
                        api_key: key,
                        render_js: true,
                        base_url: default_proxy_url(),
                    })
                }
            }
        }
    }
}

/// Returns the value or the error naming the missing credential.
pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}
