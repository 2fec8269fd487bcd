use crate::message::Message;
use serde::{Deserialize, Serialize};

/// One-off notifications for the presentation layer (toasts, inline prints).
///
/// State itself is observed through snapshots; notices only announce that
/// something happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    /// Demo visibility for the locally generated passcode.
    OtpIssued {
        phone: String,
        country_code: String,
        code: String,
    },
    RoomCreated {
        room_id: String,
        title: String,
    },
    RoomDeleted {
        room_id: String,
    },
    MessageAppended {
        message: Message,
    },
    OlderMessagesRevealed {
        room_id: String,
        page: usize,
    },
}
