//! In-memory `PersistencePort` for ephemeral sessions and tests.

use async_trait::async_trait;
use murmur_core::Result;
use murmur_core::chat::{PersistedChat, PersistencePort};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Keeps the last saved state in memory and counts saves.
#[derive(Debug, Default)]
pub struct InMemoryChatRepository {
    state: Mutex<PersistedChat>,
    saves: AtomicUsize,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `state` already stored, as if from an earlier run.
    pub fn with_state(state: PersistedChat) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of what is stored now.
    pub async fn stored(&self) -> PersistedChat {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl PersistencePort for InMemoryChatRepository {
    async fn load(&self) -> Result<PersistedChat> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &PersistedChat) -> Result<()> {
        *self.state.lock().await = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::room::ChatRoom;

    #[tokio::test]
    async fn test_save_replaces_and_counts() {
        let repo = InMemoryChatRepository::new();
        assert!(repo.load().await.unwrap().is_empty());

        let chat = PersistedChat {
            rooms: vec![ChatRoom::new("Chat 1")],
            ..PersistedChat::default()
        };
        repo.save(&chat).await.unwrap();

        assert_eq!(repo.stored().await, chat);
        assert_eq!(repo.save_count(), 1);
    }
}
