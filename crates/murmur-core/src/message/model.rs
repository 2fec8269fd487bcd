//! Chat message types.

use crate::error::{Result, SessionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Message from the user.
    User,
    /// Reply from the (simulated) assistant.
    Assistant,
}

/// An image payload attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Raw bytes of the image.
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Only non-empty `image/*` payloads up to `max_bytes` are accepted.
    pub fn validate(&self, max_bytes: usize) -> Result<()> {
        if !self.mime_type.starts_with("image/") {
            return Err(SessionError::validation("Please upload an image file"));
        }
        if self.data.is_empty() {
            return Err(SessionError::validation("Image is empty"));
        }
        if self.data.len() > max_bytes {
            return Err(SessionError::validation(format!(
                "Image size should be less than {}",
                format_size(max_bytes)
            )));
        }
        Ok(())
    }
}

/// Human-readable size in the largest unit the value reaches.
fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    let (unit, suffix) = match bytes {
        b if b >= MIB => (MIB, "MB"),
        b if b >= KIB => (KIB, "KB"),
        b => return format!("{} bytes", b),
    };
    if bytes % unit == 0 {
        format!("{}{}", bytes / unit, suffix)
    } else {
        format!("{:.1}{}", bytes as f64 / unit as f64, suffix)
    }
}

/// A single entry in a room's history. Never mutated after creation.
///
/// At least one of `text` and `attachment` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Builds a user message. Text that is blank after trimming counts as
    /// absent; non-blank text is kept verbatim.
    pub fn from_user(
        room_id: impl Into<String>,
        text: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        if text.is_none() && attachment.is_none() {
            return Err(SessionError::validation(
                "Message needs text or an image attachment",
            ));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.into(),
            sender: Sender::User,
            text,
            attachment,
            timestamp: Utc::now(),
        })
    }

    pub fn from_assistant(room_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.into(),
            sender: Sender::Assistant,
            text: Some(text.into()),
            attachment: None,
            timestamp: Utc::now(),
        }
    }
}
