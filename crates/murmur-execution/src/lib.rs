//! Timer and supersession primitives shared by the session engines.

pub mod generation;
pub mod scheduler;
pub mod tracing_layer;

pub use generation::{Generation, Ticket};
pub use scheduler::{TaskHandle, TaskScheduler};
pub use tracing_layer::{SessionLogEntry, SessionLogLayer};
