use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::loader::LoadOptions;
use crate::data::paging::DEFAULT_PAGE_SIZE;
use crate::stats::correlation::CorrelationOptions;

/// Path of a JSON settings file.
pub const CONFIG_ENV: &str = "REVIEW_DASH_CONFIG";
/// Overrides `backend_url`.
pub const BACKEND_ENV: &str = "REVIEW_DASH_BACKEND";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot open config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Dashboard settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub load: LoadOptions,
    pub correlation: CorrelationOptions,
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            load: LoadOptions::default(),
            correlation: CorrelationOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve settings from an explicit path, else `REVIEW_DASH_CONFIG`,
    /// else defaults; then apply `REVIEW_DASH_BACKEND`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let backend = std::env::var(BACKEND_ENV).ok();
        Self::resolve_with(explicit, env_path.as_deref(), backend.as_deref())
    }

    fn resolve_with(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        backend: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut settings = match explicit.or(env_path) {
            Some(path) => {
                debug!("Reading settings from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        if let Some(url) = backend.map(str::trim).filter(|u| !u.is_empty()) {
            settings.backend_url = url.to_string();
        }
        Ok(settings)
    }
}
