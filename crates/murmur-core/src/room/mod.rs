//! Chat room domain module.
//!
//! - `model`: the `ChatRoom` entity
//! - `registry`: room lifecycle and the active-room pointer (`ChatRoomRegistry`)

mod model;
mod registry;

pub use model::ChatRoom;
pub use registry::ChatRoomRegistry;
