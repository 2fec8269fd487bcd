//! Single commit point for rooms and messages.
//!
//! Every change to the chat state goes through [`ChatStore`]. A change is
//! applied, published to observers and (for durable changes) written
//! through to the persistence port while one lock is held, so observers
//! never see a partial update and saves land in commit order.

use murmur_core::chat::{ChatSnapshot, ChatState, PersistencePort};
use murmur_core::event::SessionNotice;
use murmur_core::{Result, SessionError};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};

/// Outcome of a durable commit.
///
/// `value` is `None` when the mutation declined to change anything. A failed
/// save does not roll back the in-memory change.
#[derive(Debug)]
pub struct Committed<R> {
    pub value: Option<R>,
    pub saved: Result<()>,
}

impl<R> Committed<R> {
    pub fn into_result(self) -> Result<Option<R>> {
        self.saved?;
        Ok(self.value)
    }
}

pub struct ChatStore {
    state: Mutex<ChatState>,
    persistence: Arc<dyn PersistencePort>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    notices: broadcast::Sender<SessionNotice>,
}

impl ChatStore {
    /// Loads the persisted state and starts publishing snapshots of it.
    pub async fn open(
        persistence: Arc<dyn PersistencePort>,
        notices: broadcast::Sender<SessionNotice>,
    ) -> Result<Self> {
        let persisted = persistence.load().await?;
        let state = ChatState::from_persisted(persisted);
        tracing::info!(
            target: "chat_store",
            rooms = state.registry().len(),
            "Chat state loaded"
        );

        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Ok(Self {
            state: Mutex::new(state),
            persistence,
            snapshot_tx,
            notices,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn notify(&self, notice: SessionNotice) {
        // No receivers is fine
        let _ = self.notices.send(notice);
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Applies a change to transient state (typing, pages, active room) and
    /// publishes it. Nothing is persisted.
    pub async fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut state = self.state.lock().await;
        let value = f(&mut state);
        self.snapshot_tx.send_replace(state.snapshot());
        value
    }

    /// Applies a durable change, publishes it and writes it through.
    ///
    /// The mutation returns `None` to signal "nothing changed"; in that case
    /// nothing is published or saved.
    pub async fn commit<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut ChatState) -> Option<R>,
    ) -> Committed<R> {
        let mut state = self.state.lock().await;
        let Some(value) = f(&mut state) else {
            return Committed {
                value: None,
                saved: Ok(()),
            };
        };

        self.snapshot_tx.send_replace(state.snapshot());

        let saved = self
            .persistence
            .save(&state.to_persisted())
            .await
            .map_err(|e| persistence_failure(operation, e));
        drop(state);

        Committed {
            value: Some(value),
            saved,
        }
    }

    /// Writes the current state through regardless of pending changes.
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.persistence
            .save(&state.to_persisted())
            .await
            .map_err(|e| persistence_failure("flush", e))
    }
}

fn persistence_failure(operation: &'static str, err: SessionError) -> SessionError {
    tracing::warn!(target: "chat_store", operation, error = %err, "Write-through failed");
    match err {
        SessionError::DataAccess(_) => err,
        other => SessionError::data_access(format!("Failed to save after {}: {}", operation, other)),
    }
}
