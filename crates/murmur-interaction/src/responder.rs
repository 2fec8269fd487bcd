//! Template-based stand-in for an assistant backend.

use murmur_core::config::ChatConfig;
use murmur_core::message::Responder;
use rand::Rng;
use std::time::Duration;

/// Placeholder substituted with the user's text.
const SUBJECT: &str = "{m}";

pub const RESPONSE_TEMPLATES: [&str; 7] = [
    "I understand your question about: {m}",
    "That's an interesting point about: {m}",
    "I've considered your input on: {m}",
    "Based on your message: {m}, I recommend...",
    "Thanks for sharing: {m}. Here's my perspective...",
    "Let me think about that... Regarding {m}, I'd suggest...",
    "Interesting! About {m}, here's what I know...",
];

/// Picks a random template and a random delay inside the configured window.
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    min_delay: Duration,
    max_delay: Duration,
}

impl SimulatedResponder {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        // Tolerate an inverted window instead of panicking in gen_range
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        let (min, max) = config.response_window();
        Self::new(min, max)
    }

    /// Renders template `index` (wrapped) around `user_text`.
    pub fn render(index: usize, user_text: &str) -> String {
        RESPONSE_TEMPLATES[index % RESPONSE_TEMPLATES.len()].replace(SUBJECT, user_text)
    }
}

impl Responder for SimulatedResponder {
    fn reply_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn compose_reply(&self, user_text: &str) -> String {
        let index = rand::thread_rng().gen_range(0..RESPONSE_TEMPLATES.len());
        Self::render(index, user_text)
    }
}
