//! Hand-written port doubles shared by the engine tests.

use async_trait::async_trait;
use murmur_core::auth::OtpGenerator;
use murmur_core::chat::{PersistedChat, PersistencePort};
use murmur_core::message::Responder;
use murmur_core::{Result, SessionError};
use murmur_interaction::SimulatedResponder;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Hands out the given codes in order, then repeats the last one.
pub struct SequenceOtp {
    codes: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl SequenceOtp {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
            last: Mutex::new("000000".to_string()),
        }
    }
}

impl OtpGenerator for SequenceOtp {
    fn generate(&self, _length: usize) -> String {
        let mut last = self.last.lock().unwrap();
        if let Some(code) = self.codes.lock().unwrap().pop_front() {
            *last = code;
        }
        last.clone()
    }
}

/// Always replies with the first template after scripted delays.
pub struct FixedResponder {
    delays: Mutex<VecDeque<u64>>,
    fallback_ms: u64,
}

impl FixedResponder {
    pub fn new(delay_ms: u64) -> Self {
        Self::with_delays(&[delay_ms])
    }

    /// Uses the delays in order, repeating the last one.
    pub fn with_delays(delays_ms: &[u64]) -> Self {
        Self {
            delays: Mutex::new(delays_ms.iter().copied().collect()),
            fallback_ms: delays_ms.last().copied().unwrap_or(0),
        }
    }
}

impl Responder for FixedResponder {
    fn reply_delay(&self) -> Duration {
        let next = self.delays.lock().unwrap().pop_front();
        Duration::from_millis(next.unwrap_or(self.fallback_ms))
    }

    fn compose_reply(&self, user_text: &str) -> String {
        SimulatedResponder::render(0, user_text)
    }
}

/// Loads empty and refuses every save.
pub struct FailingPersistence;

#[async_trait]
impl PersistencePort for FailingPersistence {
    async fn load(&self) -> Result<PersistedChat> {
        Ok(PersistedChat::default())
    }

    async fn save(&self, _state: &PersistedChat) -> Result<()> {
        Err(SessionError::io("disk full"))
    }
}
