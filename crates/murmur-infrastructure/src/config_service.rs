//! Configuration service implementation.
//!
//! Loads `SessionConfig` from `config.toml` and caches it.

use crate::paths::MurmurPaths;
use crate::storage::AtomicTomlFile;
use murmur_core::Result;
use murmur_core::config::SessionConfig;
use std::sync::{Arc, RwLock};

/// Loads and caches the session configuration.
///
/// A missing file is created with the defaults on first access so users have
/// something to edit.
#[derive(Debug, Clone)]
pub struct ConfigService {
    file: AtomicTomlFile<SessionConfig>,
    /// Cached configuration; `None` until first load or after invalidation.
    config: Arc<RwLock<Option<SessionConfig>>>,
}

impl ConfigService {
    pub fn new(paths: &MurmurPaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.config_file()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, loading it from disk if not cached.
    pub fn get_config(&self) -> Result<SessionConfig> {
        {
            let cached = self
                .config
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut cached = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cached = None;
    }

    fn load_config(&self) -> Result<SessionConfig> {
        let config = match self.file.load()? {
            Some(config) => config,
            None => {
                let defaults = SessionConfig::default();
                self.file.save(&defaults)?;
                tracing::info!(path = %self.file.path().display(), "Wrote default configuration");
                defaults
            }
        };
        config.validate()?;
        Ok(config)
    }
}
