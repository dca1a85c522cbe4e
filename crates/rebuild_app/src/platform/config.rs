use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rebuild_core::PollerSettings;
use rebuild_engine::ServerSettings;
use rebuild_logging::{rebuild_info, rebuild_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("`{0}` is not set (configuration file or command line)")]
    Missing(&'static str),
}

/// On-disk configuration, `rebuild.ron` by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ajax_url: Option<String>,
    pub nonce: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub resume_delay_ms: u64,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ajax_url: None,
            nonce: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 120_000,
            resume_delay_ms: 1_000,
            log_destination: LogDestination::File,
            log_file: PathBuf::from("./rebuild.log"),
        }
    }
}

/// Everything the session needs once file and command line are merged.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server: ServerSettings,
    pub poller: PollerSettings,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            rebuild_warn!("No configuration at {:?}; using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    rebuild_info!("Loaded configuration from {:?}", path);
    Ok(config)
}

impl AppConfig {
    /// Applies command-line overrides and checks required fields.
    pub fn resolve(
        self,
        ajax_url: Option<String>,
        nonce: Option<String>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let ajax_url = ajax_url
            .or(self.ajax_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("ajax_url"))?;
        let nonce = nonce
            .or(self.nonce)
            .filter(|nonce| !nonce.is_empty())
            .ok_or(ConfigError::Missing("nonce"))?;

        let server = ServerSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..ServerSettings::new(ajax_url, nonce)
        };
        Ok(ResolvedConfig {
            server,
            poller: PollerSettings {
                resume_delay: Duration::from_millis(self.resume_delay_ms),
            },
            log_destination: self.log_destination,
            log_file: self.log_file,
        })
    }
}
