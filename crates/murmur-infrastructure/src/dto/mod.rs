//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs are the on-disk schema. They stay private to the
//! infrastructure layer and absorb format changes over time.
//!
//! Versioning goes through `version-migrate`: each layout is a `Versioned`
//! struct, `MigratesTo` links consecutive layouts, and the newest one
//! converts to and from the domain with `IntoDomain` / `FromDomain`.
//!
//! ### Chat state version history
//! - **0.1.0**: no `version` key in the file; camelCase keys, `user`/`ai`
//!   senders, images stored as `data:` URLs
//! - **1.0.0**: snake_case keys, `user`/`assistant` senders, attachments as
//!   `{mime_type, data}` with base64 data

mod chat_state;

pub use chat_state::{
    CHAT_STATE_VERSION, ChatStateV0_1_0, ChatStateV1_0_0, LEGACY_CHAT_STATE_VERSION,
    create_chat_state_migrator, decode_chat_state, encode_chat_state,
};
