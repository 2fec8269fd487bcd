use super::persistence::PersistedChat;
use crate::message::{Message, MessageHistory};
use crate::room::{ChatRoom, ChatRoomRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the presentation layer observes about rooms and messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub rooms: Vec<ChatRoom>,
    pub active_room_id: Option<String>,
    pub messages_by_room: HashMap<String, Vec<Message>>,
    pub typing_by_room: HashMap<String, bool>,
    pub page_by_room: HashMap<String, usize>,
    pub loading_older: Vec<String>,
}

impl ChatSnapshot {
    pub fn messages(&self, room_id: &str) -> &[Message] {
        self.messages_by_room
            .get(room_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_typing(&self, room_id: &str) -> bool {
        self.typing_by_room.get(room_id).copied().unwrap_or(false)
    }
}

/// Rooms and histories held together so cross-cutting changes (cascade
/// delete) apply in one step.
///
/// The registry and the history each have a single writer: room lifecycle
/// goes through `registry_mut`, message traffic through `history_mut`.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    registry: ChatRoomRegistry,
    history: MessageHistory,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores from storage. Histories of rooms that no longer exist are
    /// dropped; rooms without a stored history get an empty one.
    pub fn from_persisted(persisted: PersistedChat) -> Self {
        let PersistedChat {
            rooms,
            mut messages_by_room,
        } = persisted;

        messages_by_room.retain(|room_id, _| rooms.iter().any(|room| &room.id == room_id));
        let mut history = MessageHistory::from_persisted(messages_by_room);
        for room in &rooms {
            history.ensure_room(&room.id);
        }

        Self {
            registry: ChatRoomRegistry::from_rooms(rooms),
            history,
        }
    }

    pub fn registry(&self) -> &ChatRoomRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChatRoomRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MessageHistory {
        &mut self.history
    }

    /// Creates a room together with its empty history.
    pub fn create_room(&mut self, title: Option<&str>) -> ChatRoom {
        let room = self.registry.create_room(title);
        self.history.ensure_room(&room.id);
        room
    }

    /// Removes a room and cascades to its history and flags.
    pub fn delete_room(&mut self, room_id: &str) -> Option<ChatRoom> {
        let removed = self.registry.delete_room(room_id)?;
        self.history.remove_room(room_id);
        Some(removed)
    }

    pub fn to_persisted(&self) -> PersistedChat {
        PersistedChat {
            rooms: self.registry.rooms().to_vec(),
            messages_by_room: self.history.by_room().clone(),
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            rooms: self.registry.rooms().to_vec(),
            active_room_id: self.registry.active_room_id().map(str::to_string),
            messages_by_room: self.history.by_room().clone(),
            typing_by_room: self.history.typing_by_room(),
            page_by_room: self.history.pages_by_room(),
            loading_older: self.history.loading_older(),
        }
    }
}
