//! Message domain module.
//!
//! - `model`: `Message`, `Sender`, `Attachment`
//! - `history`: per-room histories, typing flags and page counters
//! - `responder`: the `Responder` port for simulated replies

mod history;
mod model;
mod responder;

pub use history::MessageHistory;
pub use model::{Attachment, Message, Sender};
pub use responder::Responder;
