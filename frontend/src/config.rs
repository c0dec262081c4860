//! Frontend settings file.
//!
//! Read from `irobot/config.toml` under the platform config directory unless
//! `--config` names another file. Every field is optional; command-line
//! flags are applied on top.

use std::fmt;
use std::path::{Path, PathBuf};

use irobot_machines::BoardConfig;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window size as a multiple of the native resolution.
    pub scale: u32,
    /// Where screenshots are written. Defaults to the working directory.
    pub screenshot_dir: Option<PathBuf>,
    pub board: BoardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale: 3,
            screenshot_dir: None,
            board: BoardConfig::default(),
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`. An explicitly named file must exist; the default file is
    /// optional and its absence yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::parse(&std::fs::read_to_string(path)?),
            None => match default_path() {
                Some(path) if path.exists() => {
                    debug!("config: reading {}", path.display());
                    Self::parse(&std::fs::read_to_string(path)?)
                }
                _ => Ok(Self::default()),
            },
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("irobot").join("config.toml"))
}
