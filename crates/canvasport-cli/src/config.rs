//! `canvasport.toml` loading.
//!
//! Every section is optional; a missing file means all defaults.

use canvasport_kernel::{ExporterInfo, MAX_EMBED_BYTES};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "canvasport.toml";
pub const DEFAULT_STORE_ROOT: &str = ".canvasport/store";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub exporter: ExporterSection,
    pub assets: AssetsSection,
    pub store: StoreSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExporterSection {
    pub tool_version: String,
    pub build_info: String,
    pub engine_version: String,
    pub engine_contract_version: String,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            build_info: "canvasport-cli".to_string(),
            engine_version: String::new(),
            engine_contract_version: String::new(),
        }
    }
}

impl ExporterSection {
    pub fn exporter_info(&self) -> ExporterInfo {
        ExporterInfo {
            tool_version: self.tool_version.clone(),
            build_info: self.build_info.clone(),
            engine_version: self.engine_version.clone(),
            engine_contract_version: self.engine_contract_version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsSection {
    /// Files above this size are exported as references instead of embedded.
    pub embed_threshold_bytes: u64,
}

impl Default for AssetsSection {
    fn default() -> Self {
        Self {
            embed_threshold_bytes: MAX_EMBED_BYTES,
        }
    }
}

impl AssetsSection {
    /// The configured threshold, never above the embed ceiling.
    pub fn effective_threshold(&self) -> u64 {
        self.embed_threshold_bytes.min(MAX_EMBED_BYTES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub root: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load `explicit` if given (it must exist), else `canvasport.toml` in the
    /// working directory if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path)
    }
}
