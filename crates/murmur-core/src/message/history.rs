use super::model::Message;
use std::collections::{HashMap, HashSet};

/// Per-room message histories plus the transient per-room flags.
///
/// Histories are append-only; a room's entries go away only when the room
/// itself is removed. Typing flags, page counters and in-flight page loads
/// are never persisted.
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    by_room: HashMap<String, Vec<Message>>,
    typing: HashMap<String, bool>,
    pages: HashMap<String, usize>,
    loading_older: HashSet<String>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_persisted(by_room: HashMap<String, Vec<Message>>) -> Self {
        Self {
            by_room,
            ..Self::default()
        }
    }

    pub fn by_room(&self) -> &HashMap<String, Vec<Message>> {
        &self.by_room
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.by_room.contains_key(room_id)
    }

    /// Starts an empty history if the room has none yet.
    pub fn ensure_room(&mut self, room_id: &str) {
        self.by_room.entry(room_id.to_string()).or_default();
    }

    pub fn messages(&self, room_id: &str) -> &[Message] {
        self.by_room
            .get(room_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Appends, creating the room's list when absent.
    pub fn append(&mut self, message: Message) {
        self.by_room
            .entry(message.room_id.clone())
            .or_default()
            .push(message);
    }

    /// Appends only to an existing list; never recreates a removed room.
    pub fn append_existing(&mut self, message: Message) -> bool {
        match self.by_room.get_mut(&message.room_id) {
            Some(list) => {
                list.push(message);
                true
            }
            None => false,
        }
    }

    /// Drops everything held for the room.
    pub fn remove_room(&mut self, room_id: &str) -> Option<Vec<Message>> {
        self.typing.remove(room_id);
        self.pages.remove(room_id);
        self.loading_older.remove(room_id);
        self.by_room.remove(room_id)
    }

    pub fn is_typing(&self, room_id: &str) -> bool {
        self.typing.get(room_id).copied().unwrap_or(false)
    }

    pub fn set_typing(&mut self, room_id: &str, typing: bool) {
        if typing {
            self.typing.insert(room_id.to_string(), true);
        } else {
            self.typing.remove(room_id);
        }
    }

    pub fn typing_by_room(&self) -> HashMap<String, bool> {
        self.typing.clone()
    }

    /// Current page counter for the room; starts at 1.
    pub fn page(&self, room_id: &str) -> usize {
        self.pages.get(room_id).copied().unwrap_or(1)
    }

    pub fn advance_page(&mut self, room_id: &str) -> usize {
        let page = self.pages.entry(room_id.to_string()).or_insert(1);
        *page += 1;
        *page
    }

    pub fn pages_by_room(&self) -> HashMap<String, usize> {
        self.pages.clone()
    }

    /// Trailing `page * page_size` messages of the room.
    pub fn visible(&self, room_id: &str, page_size: usize) -> &[Message] {
        let all = self.messages(room_id);
        let window = self.page(room_id).saturating_mul(page_size);
        &all[all.len().saturating_sub(window)..]
    }

    pub fn has_hidden(&self, room_id: &str, page_size: usize) -> bool {
        self.visible(room_id, page_size).len() < self.messages(room_id).len()
    }

    /// Marks a page load in flight. Returns false if one already is.
    pub fn begin_loading_older(&mut self, room_id: &str) -> bool {
        self.loading_older.insert(room_id.to_string())
    }

    pub fn finish_loading_older(&mut self, room_id: &str) -> bool {
        self.loading_older.remove(room_id)
    }

    pub fn is_loading_older(&self, room_id: &str) -> bool {
        self.loading_older.contains(room_id)
    }

    pub fn loading_older(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.loading_older.iter().cloned().collect();
        rooms.sort();
        rooms
    }

    /// Clears typing flags and in-flight page loads for every room.
    ///
    /// Used once pending timers have been cancelled and can no longer land.
    /// Page counters are kept.
    pub fn settle_in_flight(&mut self) {
        self.typing.clear();
        self.loading_older.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;

    fn user(room: &str, text: &str) -> Message {
        Message::from_user(room, Some(text.to_string()), None).unwrap()
    }

    #[test]
    fn test_append_creates_missing_history() {
        let mut history = MessageHistory::new();
        history.append(user("r1", "hello"));
        assert_eq!(history.messages("r1").len(), 1);
        assert_eq!(history.messages("r1")[0].sender, Sender::User);
    }

    #[test]
    fn test_append_existing_does_not_resurrect() {
        let mut history = MessageHistory::new();
        history.ensure_room("r1");
        history.remove_room("r1");

        assert!(!history.append_existing(Message::from_assistant("r1", "late")));
        assert!(!history.has_room("r1"));
    }

    #[test]
    fn test_remove_room_clears_flags() {
        let mut history = MessageHistory::new();
        history.ensure_room("r1");
        history.set_typing("r1", true);
        history.advance_page("r1");
        history.begin_loading_older("r1");

        history.remove_room("r1");

        assert!(!history.is_typing("r1"));
        assert_eq!(history.page("r1"), 1);
        assert!(!history.is_loading_older("r1"));
    }

    #[test]
    fn test_settle_in_flight_keeps_messages_and_pages() {
        let mut history = MessageHistory::new();
        history.append(user("r1", "hello"));
        history.set_typing("r1", true);
        history.advance_page("r1");
        history.begin_loading_older("r1");
        history.begin_loading_older("r2");

        history.settle_in_flight();

        assert!(history.typing_by_room().is_empty());
        assert!(history.loading_older().is_empty());
        assert_eq!(history.page("r1"), 2);
        assert_eq!(history.messages("r1").len(), 1);
    }

    #[test]
    fn test_visible_window_grows_with_page() {
        let mut history = MessageHistory::new();
        for i in 0..5 {
            history.append(user("r1", &format!("m{}", i)));
        }

        let visible = history.visible("r1", 2);
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].text.as_deref(), Some("m3"));
        assert!(history.has_hidden("r1", 2));

        history.advance_page("r1");
        history.advance_page("r1");
        assert_eq!(history.visible("r1", 2).len(), 5);
        assert!(!history.has_hidden("r1", 2));
    }

    #[test]
    fn test_loading_guard() {
        let mut history = MessageHistory::new();
        assert!(history.begin_loading_older("r1"));
        assert!(!history.begin_loading_older("r1"));
        assert!(history.finish_loading_older("r1"));
        assert!(history.begin_loading_older("r1"));
    }
}
