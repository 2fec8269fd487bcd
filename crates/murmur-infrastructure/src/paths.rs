//! Path resolution for murmur's files.

use murmur_core::{Result, SessionError};
use std::path::{Path, PathBuf};

/// Where murmur keeps its files.
///
/// ```text
/// ~/.config/murmur/            # base directory (or --data-dir)
/// ├── config.toml              # SessionConfig
/// ├── chat_state.toml          # rooms and messages
/// └── logs/                    # daily-rolling REPL logs
///     └── murmur.log.YYYY-MM-DD
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MurmurPaths {
    base_dir: PathBuf,
}

impl MurmurPaths {
    /// Uses `base_override` when given, else the platform config directory.
    pub fn new(base_override: Option<PathBuf>) -> Result<Self> {
        let base_dir = match base_override {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or_else(|| SessionError::config("Cannot find config directory"))?
                .join("murmur"),
        };
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    pub fn chat_state_file(&self) -> PathBuf {
        self.base_dir.join("chat_state.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}
