//! Persistence port for rooms and messages.

use crate::error::Result;
use crate::message::Message;
use crate::room::ChatRoom;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Durable mirror of the chat state.
///
/// Sign-in state is never part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedChat {
    pub rooms: Vec<ChatRoom>,
    pub messages_by_room: HashMap<String, Vec<Message>>,
}

impl PersistedChat {
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.messages_by_room.is_empty()
    }
}

/// An abstract store for the chat state.
///
/// Called after every committed room or message mutation (write-through).
///
/// # Implementation Notes
///
/// - `load` on a store that has never been written returns empty
///   collections, not an error.
/// - `save` replaces the whole stored state.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Loads the stored state.
    async fn load(&self) -> Result<PersistedChat>;

    /// Replaces the stored state.
    async fn save(&self, state: &PersistedChat) -> Result<()>;
}
