//! TOML-backed `PersistencePort`.

use crate::dto::{decode_chat_state, encode_chat_state};
use crate::paths::MurmurPaths;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use murmur_core::Result;
use murmur_core::chat::{PersistedChat, PersistencePort};
use std::path::{Path, PathBuf};

/// Stores rooms and messages in a single `chat_state.toml`.
///
/// This implementation:
/// - Always writes the latest DTO version (`ChatStateV1_0_0`)
/// - Migrates older layouts on load through the chat state migrator
/// - Treats a missing or blank file as an empty store
pub struct TomlChatRepository {
    file: AtomicTomlFile<toml::Value>,
}

impl TomlChatRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Repository at `chat_state.toml` under the resolved base directory.
    pub fn at(paths: &MurmurPaths) -> Self {
        Self::new(paths.chat_state_file())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl PersistencePort for TomlChatRepository {
    async fn load(&self) -> Result<PersistedChat> {
        match self.file.load_raw()? {
            Some(content) => {
                let chat = decode_chat_state(&content)?;
                tracing::debug!(
                    path = %self.path().display(),
                    rooms = chat.rooms.len(),
                    "Loaded chat state"
                );
                Ok(chat)
            }
            None => Ok(PersistedChat::default()),
        }
    }

    async fn save(&self, state: &PersistedChat) -> Result<()> {
        let toml_value = encode_chat_state(state)?;
        self.file.save(&toml_value)
    }
}
