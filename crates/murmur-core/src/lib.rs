pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod room;

// Re-export common error type
pub use error::{Result, SessionError};
