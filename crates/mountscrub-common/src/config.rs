//! Configuration model for the mount table reader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubError};

/// Root configuration for reading and classifying mount tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Mount point of the proc filesystem to read mount tables from.
    pub proc_root: PathBuf,
    /// Whether `\ooo` octal escapes in path fields are decoded.
    pub decode_escapes: bool,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(crate::constants::DEFAULT_PROC_ROOT),
            decode_escapes: true,
        }
    }
}

impl ScrubConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ScrubError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if config.proc_root.as_os_str().is_empty() {
            return Err(ScrubError::Config {
                message: "proc_root must not be empty".into(),
            });
        }
        Ok(config)
    }
}
