use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::engine::breakdown::DEFAULT_COUNTRY_LIMIT;
use crate::engine::report::DEFAULT_COUNTRY_OF_INTEREST;
use crate::engine::ReportOptions;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Dashboard server settings. Every key is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Dataset behind the `GET /api/*` statistics
    pub dataset_path: PathBuf,
    /// Directory holding `index.html` and the `/static` assets
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub country_of_interest: String,
    /// Countries listed by `/api/country-analysis`
    pub country_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            dataset_path: PathBuf::from("data/adult.data.csv"),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            country_of_interest: DEFAULT_COUNTRY_OF_INTEREST.to_string(),
            country_limit: DEFAULT_COUNTRY_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            country_of_interest: self.country_of_interest.clone(),
        }
    }
}
