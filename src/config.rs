use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{CmsError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:1337/api";
/// Strapi's own default `pagination[pageSize]`.
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// What to do with an envelope whose `data` is neither an object nor an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Hand the raw body back unchanged.
    #[default]
    Lenient,
    /// Reject it with `CmsError::UnrecognizedShape`.
    Strict,
}

impl std::str::FromStr for ShapePolicy {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ShapePolicy::Lenient),
            "strict" => Ok(ShapePolicy::Strict),
            other => Err(CmsError::Config(format!(
                "unknown shape policy '{}' (expected 'lenient' or 'strict')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmsConfig {
    /// API root, e.g. `https://cms.womencypedia.org/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub shape_policy: ShapePolicy,
    /// When set, logs are also written as JSON to a daily rolling file here.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            shape_policy: ShapePolicy::default(),
            log_dir: None,
        }
    }
}

impl CmsConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads a TOML config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CmsError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CmsConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given (defaults otherwise), then applies `CMS_*`
    /// environment overrides. A `.env` file is honoured when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup. Split out from `load` so
    /// tests don't have to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CMS_BASE_URL") {
            self.base_url = url;
        }
        if let Some(token) = lookup("CMS_API_TOKEN") {
            self.api_token = (!token.trim().is_empty()).then_some(token);
        }
        if let Some(size) = lookup("CMS_PAGE_SIZE") {
            self.default_page_size = size
                .trim()
                .parse()
                .map_err(|e| CmsError::Config(format!("CMS_PAGE_SIZE '{}': {}", size, e)))?;
        }
        if let Some(secs) = lookup("CMS_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|e| CmsError::Config(format!("CMS_TIMEOUT_SECS '{}': {}", secs, e)))?;
        }
        if let Some(policy) = lookup("CMS_SHAPE_POLICY") {
            self.shape_policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CmsError::Config("base_url must not be empty".to_string()));
        }
        if self.default_page_size == 0 {
            return Err(CmsError::Config(
                "default_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `base_url` without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
