use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{io_error, CodexError, CodexResult};

/// Engine configuration, read from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexConfig {
    /// Root holding `<namespace>/multiblocks` and `<namespace>/tags/blocks`
    pub data_dir: PathBuf,
    /// env_logger filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Place every loaded multiblock into a scratch world and validate it
    /// at all four rotations after loading
    pub self_check: bool,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_filter: "info".to_string(),
            self_check: false,
        }
    }
}

impl CodexConfig {
    pub fn load(path: impl AsRef<Path>) -> CodexResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        let config = Self::from_toml(&text).map_err(|e| match e {
            CodexError::Config(message) => {
                CodexError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> CodexResult<Self> {
        toml::from_str(text).map_err(|e| CodexError::Config(e.to_string()))
    }
}
