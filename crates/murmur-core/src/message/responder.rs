use std::time::Duration;

/// Produces the reply that follows a user message.
///
/// Stands in for a real backend. Implementations pick how long the reply
/// takes and what it says; the pipeline owns scheduling and ordering.
pub trait Responder: Send + Sync {
    /// Delay before the reply lands.
    fn reply_delay(&self) -> Duration;

    /// Reply text for the given user text.
    fn compose_reply(&self, user_text: &str) -> String;
}
