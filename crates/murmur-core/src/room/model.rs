//! Chat room domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An independent conversation thread.
///
/// `id` is globally unique and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    /// Unique room identifier (UUID format)
    pub id: String,
    /// Human-readable room title
    pub title: String,
    /// Timestamp when the room was created
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }
}
