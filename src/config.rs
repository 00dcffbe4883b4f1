use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::Generation;

/// Main shai configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub api: ApiConfig,
    pub display: DisplayConfig,
    pub chat: ChatConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub roles: PathBuf,
    pub chats: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of an OpenAI-compatible API, up to and including `/v1`
    pub host: String,
    /// API key; `OPENAI_API_KEY` takes precedence
    pub key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Connect and first-byte timeout in seconds
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Terminal color name for completions, or "none"
    pub color: String,
    /// Print fragments as they arrive instead of waiting for the full reply
    pub streaming: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum number of messages kept per chat beyond the opening system and user turns
    pub cache_length: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            _ => eyre::bail!("Unknown log level: {}. Supported: trace, debug, info, warn, error, off", s),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let shai_dir = Config::shai_dir();

        Self {
            roles: shai_dir.join("roles"),
            chats: shai_dir.join("chats"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "https://api.openai.com/v1".to_string(),
            key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            timeout: 60,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: "magenta".to_string(),
            streaming: true,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { cache_length: 100 }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("SHAI_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from SHAI_CONFIG: {}", e);
                    }
                }
            }
        }

        for path in Self::candidate_files(std::env::var("SHAI_DIR").ok(), dirs::config_dir()) {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        // Try ./shai.yaml (for development)
        let local_config = PathBuf::from("shai.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Get the shai directory (config file, roles, chats)
    pub fn shai_dir() -> PathBuf {
        Self::shai_dir_from(std::env::var("SHAI_DIR").ok(), dirs::config_dir())
    }

    fn shai_dir_from(shai_dir_env: Option<String>, config_dir: Option<PathBuf>) -> PathBuf {
        match shai_dir_env.filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => config_dir.unwrap_or_else(|| PathBuf::from(".")).join("shai"),
        }
    }

    /// Config files searched after `--config` and `SHAI_CONFIG`, in order
    fn candidate_files(shai_dir_env: Option<String>, config_dir: Option<PathBuf>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(dir) = shai_dir_env.filter(|dir| !dir.is_empty()) {
            files.push(PathBuf::from(dir).join("shai.yaml"));
        }
        let home_file = Self::shai_dir_from(None, config_dir).join("shai.yaml");
        if !files.contains(&home_file) {
            files.push(home_file);
        }
        files
    }

    /// Where `config set` writes
    pub fn config_file() -> PathBuf {
        Self::shai_dir().join("shai.yaml")
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    pub fn roles_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.roles)
    }

    pub fn chats_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.chats)
    }

    /// API key from `OPENAI_API_KEY`, falling back to the config file
    pub fn api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api.key.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }

    /// Sampling parameters with optional per-invocation overrides
    pub fn generation(&self, model: Option<&str>, temperature: Option<f32>, top_p: Option<f32>) -> Generation {
        Generation {
            model: model.unwrap_or(&self.api.model).to_string(),
            temperature: temperature.unwrap_or(self.api.temperature),
            top_p: top_p.unwrap_or(self.api.top_p),
            stream: self.display.streaming,
        }
    }
}
