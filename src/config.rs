use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::image_processor::ResizeBounds;
use crate::uploader::retry::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Target chat, either a numeric id or an `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: ChatId,
    pub folder_path: PathBuf,
    pub max_retries: u32,
    /// Per-attempt request timeout, in seconds.
    pub timeout: f64,
    /// Fixed pause between attempts, in seconds.
    pub time_between_retries: f64,
    pub resize_max_dimension: u32,
    pub resize_min_dimension: u32,
    pub allowed_extensions: Vec<String>,
    /// Folder name to forum topic (message thread) id.
    #[serde(default)]
    pub topics: HashMap<String, i64>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("folder_path", &self.folder_path)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("time_between_retries", &self.time_between_retries)
            .field("resize_max_dimension", &self.resize_max_dimension)
            .field("resize_min_dimension", &self.resize_min_dimension)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("topics", &self.topics)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, seconds(self.time_between_retries))
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.timeout)
    }

    pub fn resize_bounds(&self) -> ResizeBounds {
        ResizeBounds {
            max_dimension: self.resize_max_dimension,
            min_dimension: self.resize_min_dimension,
        }
    }

    /// Forum topic a folder's uploads are addressed to. `None` means the
    /// chat's general context.
    pub fn topic_for(&self, folder_name: &str) -> Option<i64> {
        self.topics.get(folder_name).copied()
    }

    /// Extension check for upload candidates. Stored extensions are dot
    /// prefixed; matching ignores case on both sides.
    pub fn is_allowed_extension(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let suffix = format!(".{}", extension.to_lowercase());
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == suffix)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

pub fn parse_config(contents: &str) -> AppResult<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> AppResult<Config> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents)?;

    log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.bot_token.trim().is_empty() {
        return Err(AppError::validation("bot_token", "Must not be empty"));
    }

    if config.max_retries == 0 {
        return Err(AppError::validation("max_retries", "Must be at least 1"));
    }

    if !(config.timeout.is_finite() && config.timeout > 0.0) {
        return Err(AppError::validation("timeout", "Must be a positive number of seconds"));
    }

    if !(config.time_between_retries.is_finite() && config.time_between_retries >= 0.0) {
        return Err(AppError::validation(
            "time_between_retries",
            "Must be zero or a positive number of seconds",
        ));
    }

    if config.resize_max_dimension == 0 {
        return Err(AppError::validation("resize_max_dimension", "Must be greater than 0"));
    }

    if config.resize_min_dimension == 0 {
        return Err(AppError::validation("resize_min_dimension", "Must be greater than 0"));
    }

    if config.resize_min_dimension > config.resize_max_dimension {
        return Err(AppError::validation(
            "resize_min_dimension",
            "Must not exceed resize_max_dimension",
        ));
    }

    if config.allowed_extensions.is_empty() {
        return Err(AppError::validation("allowed_extensions", "Must list at least one extension"));
    }

    Ok(())
}

/// Merge discovered topics into the `topics` table of the config file at
/// `path`, leaving every other key as it was. Returns the number of entries
/// written.
pub fn save_topics(path: &Path, topics: &BTreeMap<String, i64>) -> AppResult<usize> {
    let contents = fs::read_to_string(path)?;
    let mut document: toml::Table = toml::from_str(&contents)?;

    let table = document
        .entry("topics")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let Some(table) = table.as_table_mut() else {
        return Err(AppError::validation("topics", "Must be a table of name = id"));
    };

    for (name, id) in topics {
        table.insert(name.clone(), toml::Value::Integer(*id));
    }

    // Create backup of existing config
    let backup_path = backup_path(path);
    if let Err(e) = fs::copy(path, &backup_path) {
        log::warn!("Failed to create config backup: {}", e);
    }

    fs::write(path, toml::to_string_pretty(&document)?)?;

    log::info!("Topics saved to {}", path.display());
    Ok(topics.len())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}
