use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;
use crate::reader::ReadMode;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Cache settings, usually loaded from a TOML file:
///
/// ```toml
/// path = "/var/cache/sim"
/// read_mode = "strict"
/// sync = true
/// ```
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding one store file per cached function.
    pub path: PathBuf,
    /// How truncated store tails are handled on open.
    pub read_mode: ReadMode,
    /// Fsync after every write.
    pub sync: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_DIR),
            read_mode: ReadMode::default(),
            sync: false,
        }
    }
}

impl CacheConfig {
    /// Default settings rooted at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CacheError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
