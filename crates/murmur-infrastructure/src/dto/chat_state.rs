//! Chat state DTOs and migrations.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use murmur_core::chat::PersistedChat;
use murmur_core::message::{Attachment, Message, Sender};
use murmur_core::room::ChatRoom;
use murmur_core::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use version_migrate::{FromDomain, IntoDomain, MigratesTo, Versioned};

/// Entity name registered with the migrator.
const CHAT_STATE_ENTITY: &str = "chat_state";

/// Version written by every save.
pub const CHAT_STATE_VERSION: &str = "1.0.0";

/// Version assumed for files written before the `version` key existed.
pub const LEGACY_CHAT_STATE_VERSION: &str = "0.1.0";

// ============================================================================
// V0.1.0: unversioned layout
// ============================================================================

/// Chat state as stored before versioning: camelCase keys, `user`/`ai`
/// senders and images inlined as `data:` URLs.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "0.1.0")]
#[serde(rename_all = "camelCase")]
pub struct ChatStateV0_1_0 {
    #[serde(default)]
    pub rooms: Vec<RoomV0_1_0>,
    #[serde(default)]
    pub messages_by_room: BTreeMap<String, Vec<MessageV0_1_0>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomV0_1_0 {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderV0_1_0 {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageV0_1_0 {
    pub id: String,
    pub sender: SenderV0_1_0,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `data:<mime>;base64,<payload>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// V1.0.0: current layout
// ============================================================================

/// Current on-disk layout of `chat_state.toml`.
///
/// The `version` key is added by the migrator's flat format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct ChatStateV1_0_0 {
    #[serde(default)]
    pub rooms: Vec<RoomV1_0_0>,
    /// Keyed by room id. The key is the only place a message's room is stored.
    #[serde(default)]
    pub messages_by_room: BTreeMap<String, Vec<MessageV1_0_0>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomV1_0_0 {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageV1_0_0 {
    pub id: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentV1_0_0>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentV1_0_0 {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded)
    pub data: String,
}

// ============================================================================
// Migrations
// ============================================================================

/// Splits a base64 `data:` URL into MIME type and payload.
fn split_data_url(url: &str) -> Option<AttachmentV1_0_0> {
    let (header, payload) = url.strip_prefix("data:")?.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    if mime_type.is_empty() || payload.is_empty() {
        return None;
    }
    Some(AttachmentV1_0_0 {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

/// Migration from V0.1.0 to V1.0.0.
///
/// Images become attachments and `ai` becomes `assistant`. Messages left
/// with neither text nor a readable image are dropped.
impl MigratesTo<ChatStateV1_0_0> for ChatStateV0_1_0 {
    fn migrate(self) -> ChatStateV1_0_0 {
        let rooms = self
            .rooms
            .into_iter()
            .map(|room| RoomV1_0_0 {
                id: room.id,
                title: room.title,
                created_at: room.created_at,
            })
            .collect();

        let messages_by_room = self
            .messages_by_room
            .into_iter()
            .map(|(room_id, messages)| {
                let migrated = messages
                    .into_iter()
                    .filter_map(|message| {
                        let attachment = message.image.as_deref().and_then(split_data_url);
                        if message.image.is_some() && attachment.is_none() {
                            tracing::warn!(message_id = %message.id, "Dropping unreadable legacy image");
                        }
                        let text = message.text.filter(|t| !t.trim().is_empty());
                        if text.is_none() && attachment.is_none() {
                            tracing::warn!(message_id = %message.id, "Dropping empty legacy message");
                            return None;
                        }
                        Some(MessageV1_0_0 {
                            id: message.id,
                            sender: match message.sender {
                                SenderV0_1_0::User => Sender::User,
                                SenderV0_1_0::Ai => Sender::Assistant,
                            },
                            text,
                            attachment,
                            timestamp: message.timestamp,
                        })
                    })
                    .collect();
                (room_id, migrated)
            })
            .collect();

        ChatStateV1_0_0 {
            rooms,
            messages_by_room,
        }
    }
}

// ============================================================================
// Domain model conversions
// ============================================================================

/// Attachments that fail to decode are dropped, along with any message
/// that has nothing else left.
impl IntoDomain<PersistedChat> for ChatStateV1_0_0 {
    fn into_domain(self) -> PersistedChat {
        let rooms = self
            .rooms
            .into_iter()
            .map(|room| ChatRoom {
                id: room.id,
                title: room.title,
                created_at: room.created_at,
            })
            .collect();

        let messages_by_room = self
            .messages_by_room
            .into_iter()
            .map(|(room_id, dtos)| {
                let messages = dtos
                    .into_iter()
                    .filter_map(|dto| message_into_domain(&room_id, dto))
                    .collect();
                (room_id, messages)
            })
            .collect();

        PersistedChat {
            rooms,
            messages_by_room,
        }
    }
}

fn message_into_domain(room_id: &str, dto: MessageV1_0_0) -> Option<Message> {
    let attachment = dto.attachment.and_then(|a| {
        match STANDARD.decode(a.data.as_bytes()) {
            Ok(data) => Some(Attachment::new(a.mime_type, data)),
            Err(e) => {
                tracing::warn!(message_id = %dto.id, error = %e, "Dropping undecodable attachment");
                None
            }
        }
    });
    if dto.text.is_none() && attachment.is_none() {
        tracing::warn!(message_id = %dto.id, "Dropping message with no content");
        return None;
    }

    Some(Message {
        id: dto.id,
        room_id: room_id.to_string(),
        sender: dto.sender,
        text: dto.text,
        attachment,
        timestamp: dto.timestamp,
    })
}

impl FromDomain<PersistedChat> for ChatStateV1_0_0 {
    fn from_domain(chat: PersistedChat) -> Self {
        let rooms = chat
            .rooms
            .into_iter()
            .map(|room| RoomV1_0_0 {
                id: room.id,
                title: room.title,
                created_at: room.created_at,
            })
            .collect();

        let messages_by_room = chat
            .messages_by_room
            .into_iter()
            .map(|(room_id, messages)| {
                let dtos = messages
                    .into_iter()
                    .map(|message| MessageV1_0_0 {
                        id: message.id,
                        sender: message.sender,
                        text: message.text,
                        attachment: message.attachment.map(|a| AttachmentV1_0_0 {
                            mime_type: a.mime_type,
                            data: STANDARD.encode(&a.data),
                        }),
                        timestamp: message.timestamp,
                    })
                    .collect();
                (room_id, dtos)
            })
            .collect();

        Self {
            rooms,
            messages_by_room,
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Creates the migrator for `chat_state.toml`.
///
/// # Migration Path
///
/// - V0.1.0 → V1.0.0: camelCase keys to snake_case, data-URL images to
///   attachments, `ai` sender to `assistant`
/// - V1.0.0 → PersistedChat
pub fn create_chat_state_migrator() -> Result<version_migrate::Migrator> {
    let mut migrator = version_migrate::Migrator::builder().build();

    let chat_state_path = version_migrate::Migrator::define(CHAT_STATE_ENTITY)
        .from::<ChatStateV0_1_0>()
        .step::<ChatStateV1_0_0>()
        .into_with_save::<PersistedChat>();

    migrator.register(chat_state_path).map_err(|e| {
        SessionError::internal(format!("Failed to register chat_state migration path: {}", e))
    })?;

    Ok(migrator)
}

fn serialization_error(message: String) -> SessionError {
    SessionError::Serialization {
        format: "TOML".to_string(),
        message,
    }
}

/// Parses `chat_state.toml` contents of any known version into the domain.
///
/// A file with no `version` key is read as V0.1.0.
pub fn decode_chat_state(content: &str) -> Result<PersistedChat> {
    let mut toml_value: toml::Value = toml::from_str(content)?;

    if let toml::Value::Table(table) = &mut toml_value {
        if !table.contains_key("version") {
            tracing::info!(
                "Migrating unversioned chat state to {}",
                CHAT_STATE_VERSION
            );
            table.insert(
                "version".to_string(),
                toml::Value::String(LEGACY_CHAT_STATE_VERSION.to_string()),
            );
        }
    }

    let migrator = create_chat_state_migrator()?;
    migrator
        .load_flat_from(CHAT_STATE_ENTITY, toml_value)
        .map_err(|e| serialization_error(format!("Failed to migrate chat state: {}", e)))
}

/// Serializes the domain into the latest layout, `version` key included.
pub fn encode_chat_state(chat: &PersistedChat) -> Result<toml::Value> {
    let migrator = create_chat_state_migrator()?;
    let json_str = migrator
        .save_domain_flat(CHAT_STATE_ENTITY, chat)
        .map_err(|e| serialization_error(format!("Failed to serialize chat state: {}", e)))?;

    let json_value: serde_json::Value = serde_json::from_str(&json_str).map_err(|e| {
        serialization_error(format!("Failed to parse JSON during serialization: {}", e))
    })?;

    Ok(toml::Value::try_from(json_value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_chat() -> PersistedChat {
        let room = ChatRoom::new("Chat 1");
        let text = Message::from_user(&room.id, Some("hi".into()), None).unwrap();
        let image = Message::from_user(
            &room.id,
            None,
            Some(Attachment::new("image/png", vec![0x89, 0x50, 0x4e, 0x47])),
        )
        .unwrap();
        let reply = Message::from_assistant(&room.id, "I understand your question about: hi");

        let mut messages_by_room = HashMap::new();
        messages_by_room.insert(room.id.clone(), vec![text, image, reply]);
        PersistedChat {
            rooms: vec![room],
            messages_by_room,
        }
    }

    #[test]
    fn test_chat_state_migrator_creation() {
        assert!(create_chat_state_migrator().is_ok());
    }

    #[test]
    fn test_current_layout_survives_toml() {
        let chat = sample_chat();
        let content = toml::to_string_pretty(&encode_chat_state(&chat).unwrap()).unwrap();

        assert!(content.contains("version = \"1.0.0\""));
        assert!(content.contains("[[rooms]]"));
        assert!(content.contains("sender = \"assistant\""));

        let decoded = decode_chat_state(&content).unwrap();
        assert_eq!(decoded, chat);
    }

    #[test]
    fn test_unversioned_layout_is_migrated() {
        let content = r#"
            [[rooms]]
            id = "1700000000000"
            title = "Chat 1"
            createdAt = "2024-01-01T10:00:00Z"

            [[messagesByRoom.1700000000000]]
            id = "m1"
            sender = "user"
            text = "hello"
            timestamp = "2024-01-01T10:00:01Z"

            [[messagesByRoom.1700000000000]]
            id = "m2"
            sender = "user"
            text = ""
            image = "data:image/png;base64,iVBORw=="
            timestamp = "2024-01-01T10:00:02Z"

            [[messagesByRoom.1700000000000]]
            id = "m3"
            sender = "ai"
            text = "Thanks for sharing: hello. Here's my perspective..."
            timestamp = "2024-01-01T10:00:03Z"

            [[messagesByRoom.1700000000000]]
            id = "m4"
            sender = "user"
            image = "not-a-data-url"
            timestamp = "2024-01-01T10:00:04Z"
        "#;

        let chat = decode_chat_state(content).unwrap();
        assert_eq!(chat.rooms.len(), 1);
        assert_eq!(chat.rooms[0].title, "Chat 1");

        let messages = &chat.messages_by_room["1700000000000"];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].room_id, "1700000000000");
        assert!(messages[1].text.is_none());
        let attachment = messages[1].attachment.as_ref().unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(messages[2].sender, Sender::Assistant);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = decode_chat_state("version = \"9.0.0\"\n").unwrap_err();
        assert!(matches!(err, SessionError::Serialization { .. }));
    }

    #[test]
    fn test_undecodable_attachment_is_dropped() {
        let content = r#"
            version = "1.0.0"

            [[rooms]]
            id = "r1"
            title = "Chat 1"
            created_at = "2024-01-01T10:00:00Z"

            [[messages_by_room.r1]]
            id = "m1"
            sender = "user"
            timestamp = "2024-01-01T10:00:01Z"

            [messages_by_room.r1.attachment]
            mime_type = "image/png"
            data = "%%%"

            [[messages_by_room.r1]]
            id = "m2"
            sender = "user"
            text = "caption"
            timestamp = "2024-01-01T10:00:02Z"

            [messages_by_room.r1.attachment]
            mime_type = "image/png"
            data = "%%%"
        "#;

        let chat = decode_chat_state(content).unwrap();
        let messages = &chat.messages_by_room["r1"];
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m2");
        assert_eq!(messages[0].text.as_deref(), Some("caption"));
        assert!(messages[0].attachment.is_none());
    }

    #[test]
    fn test_split_data_url() {
        let attachment = split_data_url("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert_eq!(attachment.data, "AAAA");
        assert!(split_data_url("data:image/jpeg,AAAA").is_none());
        assert!(split_data_url("http://example.com/a.png").is_none());
    }
}
