//! Room lifecycle commands.

use crate::chat_store::ChatStore;
use murmur_core::{Result, SessionError};
use murmur_core::event::SessionNotice;
use murmur_core::room::ChatRoom;
use std::sync::Arc;

/// Create, delete, select, rename and search rooms through the store.
///
/// Deleting does not touch pending replies; the caller cancels those first
/// (see `SessionFacade::delete_room`).
pub struct RoomController {
    store: Arc<ChatStore>,
}

impl RoomController {
    pub fn new(store: Arc<ChatStore>) -> Self {
        Self { store }
    }

    pub async fn create_room(&self, title: Option<&str>) -> Result<ChatRoom> {
        let committed = self
            .store
            .commit("create_room", |state| Some(state.create_room(title)))
            .await;

        if let Some(room) = &committed.value {
            tracing::info!(target: "chat_store", room_id = %room.id, title = %room.title, "Room created");
            self.store.notify(SessionNotice::RoomCreated {
                room_id: room.id.clone(),
                title: room.title.clone(),
            });
        }

        committed
            .into_result()?
            .ok_or_else(|| SessionError::internal("room creation produced no room"))
    }

    /// `SessionError::NotFound` for an unknown id.
    pub async fn delete_room(&self, room_id: &str) -> Result<()> {
        let committed = self
            .store
            .commit("delete_room", |state| state.delete_room(room_id))
            .await;

        if committed.value.is_none() {
            return Err(SessionError::not_found("room", room_id));
        }

        tracing::info!(target: "chat_store", room_id, "Room deleted");
        self.store.notify(SessionNotice::RoomDeleted {
            room_id: room_id.to_string(),
        });
        committed.saved
    }

    /// Unknown ids are ignored. The active room is not persisted.
    pub async fn select_room(&self, room_id: &str) -> bool {
        self.store
            .update(|state| state.registry_mut().set_active_room(room_id))
            .await
    }

    /// `SessionError::NotFound` for an unknown id; a blank title is a
    /// validation error.
    pub async fn rename_room(&self, room_id: &str, title: &str) -> Result<()> {
        let mut rejected = None;
        let committed = self
            .store
            .commit("rename_room", |state| {
                match state.registry_mut().rename_room(room_id, title) {
                    Ok(true) => Some(()),
                    Ok(false) => None,
                    Err(err) => {
                        rejected = Some(err);
                        None
                    }
                }
            })
            .await;

        if let Some(err) = rejected {
            return Err(err);
        }
        committed
            .into_result()?
            .ok_or_else(|| SessionError::not_found("room", room_id))
    }

    pub async fn search_rooms(&self, query: &str) -> Vec<ChatRoom> {
        self.store
            .read(|state| state.registry().search(query).into_iter().cloned().collect())
            .await
    }
}
