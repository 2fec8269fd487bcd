//! Combined chat state and its persistence port.

mod persistence;
mod state;

pub use persistence::{PersistedChat, PersistencePort};
pub use state::{ChatSnapshot, ChatState};
