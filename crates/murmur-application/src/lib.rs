//! Application layer for murmur.
//!
//! The async engines that sit between the domain state machines and a
//! front end: sign-in with simulated latency, the message pipeline with
//! its deferred replies, room commands and the facade tying them together.

pub mod auth_flow;
pub mod chat_store;
pub mod facade;
pub mod message_pipeline;
pub mod rooms;

#[cfg(test)]
mod testing;

pub use auth_flow::AuthFlowController;
pub use chat_store::{ChatStore, Committed};
pub use facade::{SessionCollaborators, SessionFacade};
pub use message_pipeline::{ATTACHMENT_SUBJECT, MessagePipeline};
pub use rooms::RoomController;
