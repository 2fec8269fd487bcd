//! Composition root consumed by front ends.
//!
//! [`SessionFacade`] wires the engines together and forwards commands; it
//! holds no business rules of its own.

use crate::auth_flow::AuthFlowController;
use crate::chat_store::ChatStore;
use crate::message_pipeline::MessagePipeline;
use crate::rooms::RoomController;
use murmur_core::{Result, SessionError};
use murmur_core::auth::{AuthView, OtpGenerator};
use murmur_core::chat::{ChatSnapshot, PersistencePort};
use murmur_core::config::SessionConfig;
use murmur_core::event::SessionNotice;
use murmur_core::message::{Attachment, Message, Responder};
use murmur_core::room::ChatRoom;
use murmur_execution::TaskScheduler;
use murmur_interaction::{
    CountryCodeLookup, CountryDirectory, CountryOption, RandomOtpGenerator, SimulatedResponder,
    StaticCountryDirectory,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const NOTICE_CAPACITY: usize = 64;

/// Stand-ins for the services a real deployment would call.
#[derive(Clone)]
pub struct SessionCollaborators {
    pub otp: Arc<dyn OtpGenerator>,
    pub responder: Arc<dyn Responder>,
    pub countries: Arc<dyn CountryDirectory>,
}

impl SessionCollaborators {
    /// Local OTP generation, template replies and the bundled country table.
    pub fn simulated(config: &SessionConfig) -> Self {
        Self {
            otp: Arc::new(RandomOtpGenerator),
            responder: Arc::new(SimulatedResponder::from_config(&config.chat)),
            countries: Arc::new(StaticCountryDirectory::default()),
        }
    }
}

pub struct SessionFacade {
    config: SessionConfig,
    auth: AuthFlowController,
    store: Arc<ChatStore>,
    rooms: RoomController,
    pipeline: MessagePipeline,
    lookup: CountryCodeLookup,
    scheduler: Arc<TaskScheduler>,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionFacade {
    /// Loads persisted rooms and messages and builds every engine.
    ///
    /// The first room of the stored list becomes active. Sign-in always
    /// starts anonymous.
    pub async fn bootstrap(
        config: SessionConfig,
        persistence: Arc<dyn PersistencePort>,
        collaborators: SessionCollaborators,
    ) -> Result<Self> {
        config.validate()?;

        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let scheduler = Arc::new(TaskScheduler::new());
        let store = Arc::new(ChatStore::open(persistence, notices.clone()).await?);

        let auth = AuthFlowController::new(config.auth.clone(), collaborators.otp, notices.clone());
        let rooms = RoomController::new(store.clone());
        let pipeline = MessagePipeline::new(
            store.clone(),
            scheduler.clone(),
            collaborators.responder,
            config.chat.clone(),
        );
        let lookup = CountryCodeLookup::new(collaborators.countries, &config.lookup);

        tracing::info!("Session ready");
        Ok(Self {
            config,
            auth,
            store,
            rooms,
            pipeline,
            lookup,
            scheduler,
            notices,
        })
    }

    /// Cancels every outstanding timer, clears the flags those timers would
    /// have cleared, and writes the chat state through.
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown();
        self.store
            .update(|state| state.history_mut().settle_in_flight())
            .await;
        self.store.flush().await?;
        tracing::info!("Session shut down");
        Ok(())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub fn auth_view(&self) -> AuthView {
        self.auth.view()
    }

    pub fn subscribe_auth(&self) -> watch::Receiver<AuthView> {
        self.auth.subscribe()
    }

    pub async fn submit_credentials(&self, phone: &str, country_code: &str) -> Result<()> {
        self.auth.submit_credentials(phone, country_code).await
    }

    pub async fn send_otp(&self) -> Result<()> {
        self.auth.send_otp().await
    }

    pub async fn verify_otp(&self, code: &str) -> Result<()> {
        self.auth.verify_otp(code).await
    }

    pub async fn logout(&self) {
        self.auth.logout().await
    }

    /// Debounced dial-code search; `None` when a newer search superseded it.
    pub async fn search_country_codes(&self, query: &str) -> Result<Option<Vec<CountryOption>>> {
        self.lookup.search(query).await
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    pub fn chat_snapshot(&self) -> ChatSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe_chat(&self) -> watch::Receiver<ChatSnapshot> {
        self.store.subscribe()
    }

    pub async fn create_room(&self, title: Option<&str>) -> Result<ChatRoom> {
        self.rooms.create_room(title).await
    }

    /// Cancels the room's pending replies, then removes it with its history.
    ///
    /// `false` when no such room exists.
    pub async fn delete_room(&self, room_id: &str) -> Result<bool> {
        self.pipeline.cancel_room(room_id);
        let deleted = absent_as_none(self.rooms.delete_room(room_id).await)?;
        Ok(deleted.is_some())
    }

    pub async fn select_room(&self, room_id: &str) -> bool {
        self.rooms.select_room(room_id).await
    }

    /// `false` when no such room exists.
    pub async fn rename_room(&self, room_id: &str, title: &str) -> Result<bool> {
        let renamed = absent_as_none(self.rooms.rename_room(room_id, title).await)?;
        Ok(renamed.is_some())
    }

    pub async fn search_rooms(&self, query: &str) -> Vec<ChatRoom> {
        self.rooms.search_rooms(query).await
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub async fn send_message(
        &self,
        room_id: &str,
        text: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Option<Message>> {
        absent_as_none(self.pipeline.send_message(room_id, text, attachment).await)
    }

    pub async fn load_older_messages(&self, room_id: &str) -> bool {
        self.pipeline.load_older_messages(room_id).await
    }

    pub async fn visible_messages(&self, room_id: &str) -> Vec<Message> {
        self.pipeline.visible_messages(room_id).await
    }

    pub async fn has_older_messages(&self, room_id: &str) -> bool {
        self.pipeline.has_older_messages(room_id).await
    }
}

/// Front ends treat commands against a missing room as no-ops.
fn absent_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SessionError::NotFound { entity_type, id }) => {
            tracing::debug!(entity_type, id = %id, "Command target no longer exists");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
