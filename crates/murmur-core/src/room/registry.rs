use super::model::ChatRoom;
use crate::error::{Result, SessionError};

/// Owns the ordered room list and the active-room pointer.
///
/// Rooms are kept most-recent-first. The active pointer is always either
/// `None` or the id of a room in the list; every removal re-checks it.
#[derive(Debug, Clone, Default)]
pub struct ChatRoomRegistry {
    rooms: Vec<ChatRoom>,
    active_room_id: Option<String>,
}

impl ChatRoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the registry from stored rooms. The head becomes active.
    pub fn from_rooms(rooms: Vec<ChatRoom>) -> Self {
        let active_room_id = rooms.first().map(|room| room.id.clone());
        Self {
            rooms,
            active_room_id,
        }
    }

    pub fn rooms(&self) -> &[ChatRoom] {
        &self.rooms
    }

    pub fn active_room_id(&self) -> Option<&str> {
        self.active_room_id.as_deref()
    }

    pub fn get(&self, room_id: &str) -> Option<&ChatRoom> {
        self.rooms.iter().find(|room| room.id == room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.get(room_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Creates a room at the head of the list and makes it active.
    ///
    /// A missing or blank title becomes `Chat {n+1}` where `n` is the room
    /// count before insertion.
    pub fn create_room(&mut self, title: Option<&str>) -> ChatRoom {
        let title = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Chat {}", self.rooms.len() + 1),
        };

        let room = ChatRoom::new(title);
        self.rooms.insert(0, room.clone());
        self.active_room_id = Some(room.id.clone());
        room
    }

    /// Removes a room. If it was active, the new head (or nothing) becomes
    /// active. Returns `None` when the id is unknown.
    pub fn delete_room(&mut self, room_id: &str) -> Option<ChatRoom> {
        let index = self.rooms.iter().position(|room| room.id == room_id)?;
        let removed = self.rooms.remove(index);

        if self.active_room_id.as_deref() == Some(room_id) {
            self.active_room_id = self.rooms.first().map(|room| room.id.clone());
        }

        Some(removed)
    }

    /// Points the active room at `room_id`. Unknown ids are ignored.
    pub fn set_active_room(&mut self, room_id: &str) -> bool {
        if !self.contains(room_id) {
            return false;
        }
        self.active_room_id = Some(room_id.to_string());
        true
    }

    /// Changes a room title. Returns `Ok(false)` for unknown ids.
    pub fn rename_room(&mut self, room_id: &str, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::validation("Room title cannot be empty"));
        }

        match self.rooms.iter_mut().find(|room| room.id == room_id) {
            Some(room) => {
                room.title = title.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Case-insensitive substring match over titles, in list order.
    pub fn search(&self, query: &str) -> Vec<&ChatRoom> {
        let needle = query.to_lowercase();
        self.rooms
            .iter()
            .filter(|room| room.title.to_lowercase().contains(&needle))
            .collect()
    }
}
