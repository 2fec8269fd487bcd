//! Outbound messages, simulated replies and cosmetic pagination.

use crate::chat_store::ChatStore;
use murmur_core::config::ChatConfig;
use murmur_core::event::SessionNotice;
use murmur_core::message::{Attachment, Message, Responder};
use murmur_core::{Result, SessionError};
use murmur_execution::{TaskHandle, TaskScheduler};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Subject used in replies to messages that carry only an image.
pub const ATTACHMENT_SUBJECT: &str = "the attached image";

/// Outstanding timers per room, so deleting a room can cancel them.
#[derive(Debug, Default)]
struct PendingTimers(Mutex<HashMap<String, Vec<TaskHandle>>>);

impl PendingTimers {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<TaskHandle>>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn track(&self, room_id: &str, handle: TaskHandle) {
        self.lock().entry(room_id.to_string()).or_default().push(handle);
    }

    fn forget(&self, room_id: &str, handle_id: u64) {
        let mut timers = self.lock();
        if let Some(handles) = timers.get_mut(room_id) {
            handles.retain(|h| h.id() != handle_id);
            if handles.is_empty() {
                timers.remove(room_id);
            }
        }
    }

    fn cancel_room(&self, room_id: &str) -> usize {
        let handles = self.lock().remove(room_id).unwrap_or_default();
        for handle in &handles {
            handle.cancel();
        }
        handles.len()
    }

    fn count(&self, room_id: &str) -> usize {
        self.lock().get(room_id).map_or(0, Vec::len)
    }
}

/// Owns message traffic: user sends, deferred assistant replies, typing
/// flags and page counters.
///
/// Replies are scheduled independently with random delays, so when several
/// sends overlap in one room the replies land in completion order. The
/// first reply to land clears the room's typing flag.
pub struct MessagePipeline {
    store: Arc<ChatStore>,
    scheduler: Arc<TaskScheduler>,
    responder: Arc<dyn Responder>,
    config: ChatConfig,
    pending: Arc<PendingTimers>,
}

impl MessagePipeline {
    pub fn new(
        store: Arc<ChatStore>,
        scheduler: Arc<TaskScheduler>,
        responder: Arc<dyn Responder>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            responder,
            config,
            pending: Arc::new(PendingTimers::default()),
        }
    }

    /// Appends a user message and schedules its reply.
    ///
    /// Returns `SessionError::NotFound` when the room does not exist.
    /// Validation failures (no content, non-image or oversized attachment)
    /// change nothing.
    pub async fn send_message(
        &self,
        room_id: &str,
        text: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message> {
        if let Some(attachment) = &attachment {
            attachment.validate(self.config.max_attachment_bytes)?;
        }
        let message = Message::from_user(room_id, text, attachment)?;

        let committed = self
            .store
            .commit("send_message", |state| {
                if !state.registry().contains(room_id) {
                    return None;
                }
                state.history_mut().append(message.clone());
                state.history_mut().set_typing(room_id, true);
                Some(message)
            })
            .await;

        let Some(message) = committed.value else {
            return Err(SessionError::not_found("room", room_id));
        };

        self.store.notify(SessionNotice::MessageAppended {
            message: message.clone(),
        });
        self.schedule_reply(&message);

        committed.saved?;
        Ok(message)
    }

    fn schedule_reply(&self, message: &Message) {
        let room_id = message.room_id.clone();
        let subject = message
            .text
            .clone()
            .unwrap_or_else(|| ATTACHMENT_SUBJECT.to_string());
        let delay = self.responder.reply_delay();

        let store = self.store.clone();
        let responder = self.responder.clone();
        let pending = self.pending.clone();
        let handle_slot = Arc::new(std::sync::OnceLock::<u64>::new());
        let own_id = handle_slot.clone();

        let handle = self.scheduler.schedule("assistant_reply", delay, move || async move {
            if let Some(id) = own_id.get() {
                pending.forget(&room_id, *id);
            }
            deliver_reply(&store, responder.as_ref(), &room_id, &subject).await;
        });

        let _ = handle_slot.set(handle.id());
        self.pending.track(&message.room_id, handle);
        tracing::debug!(
            target: "message_pipeline",
            room_id = %message.room_id,
            delay_ms = delay.as_millis() as u64,
            "Reply scheduled"
        );
    }

    /// Starts revealing the next page of an already-loaded history.
    ///
    /// Returns `false` (no-op) for an unknown room, when everything is
    /// already visible, or while a load for the room is in flight.
    pub async fn load_older_messages(&self, room_id: &str) -> bool {
        let page_size = self.config.page_size;
        let started = self
            .store
            .update(|state| {
                state.registry().contains(room_id)
                    && state.history().has_hidden(room_id, page_size)
                    && state.history_mut().begin_loading_older(room_id)
            })
            .await;

        if !started {
            tracing::debug!(target: "message_pipeline", room_id, "Older-page load skipped");
            return false;
        }

        let store = self.store.clone();
        let pending = self.pending.clone();
        let owned_room = room_id.to_string();
        let handle_slot = Arc::new(std::sync::OnceLock::<u64>::new());
        let own_id = handle_slot.clone();

        let handle = self.scheduler.schedule(
            "load_older",
            self.config.page_load_delay(),
            move || async move {
                if let Some(id) = own_id.get() {
                    pending.forget(&owned_room, *id);
                }
                let page = store
                    .update(|state| {
                        if !state.history_mut().finish_loading_older(&owned_room) {
                            return None;
                        }
                        Some(state.history_mut().advance_page(&owned_room))
                    })
                    .await;
                if let Some(page) = page {
                    store.notify(SessionNotice::OlderMessagesRevealed {
                        room_id: owned_room,
                        page,
                    });
                }
            },
        );
        let _ = handle_slot.set(handle.id());
        self.pending.track(room_id, handle);
        true
    }

    /// Cancels every reply and page load still pending for the room.
    pub fn cancel_room(&self, room_id: &str) {
        let cancelled = self.pending.cancel_room(room_id);
        if cancelled > 0 {
            tracing::debug!(target: "message_pipeline", room_id, cancelled, "Pending timers cancelled");
        }
    }

    /// Number of replies and page loads still outstanding for the room.
    pub fn pending_count(&self, room_id: &str) -> usize {
        self.pending.count(room_id)
    }

    /// The trailing `page * page_size` messages of the room.
    pub async fn visible_messages(&self, room_id: &str) -> Vec<Message> {
        let page_size = self.config.page_size;
        self.store
            .read(|state| state.history().visible(room_id, page_size).to_vec())
            .await
    }

    pub async fn has_older_messages(&self, room_id: &str) -> bool {
        let page_size = self.config.page_size;
        self.store
            .read(|state| state.history().has_hidden(room_id, page_size))
            .await
    }
}

/// Completion of a scheduled reply. A room deleted in the meantime gets
/// nothing: the list is never recreated.
async fn deliver_reply(store: &ChatStore, responder: &dyn Responder, room_id: &str, subject: &str) {
    let reply = Message::from_assistant(room_id, responder.compose_reply(subject));

    let committed = store
        .commit("assistant_reply", |state| {
            if !state.registry().contains(room_id) {
                return None;
            }
            if !state.history_mut().append_existing(reply.clone()) {
                return None;
            }
            state.history_mut().set_typing(room_id, false);
            Some(reply)
        })
        .await;

    let Some(reply) = committed.value else {
        tracing::debug!(target: "message_pipeline", room_id, "Reply for removed room discarded");
        return;
    };
    store.notify(SessionNotice::MessageAppended { message: reply });

    if let Err(err) = committed.saved {
        tracing::warn!(target: "message_pipeline", room_id, error = %err, "Reply kept in memory only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedResponder;
    use murmur_core::message::Sender;
    use murmur_infrastructure::InMemoryChatRepository;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Fixture {
        store: Arc<ChatStore>,
        pipeline: MessagePipeline,
        repo: Arc<InMemoryChatRepository>,
    }

    async fn fixture(responder: FixedResponder, config: ChatConfig) -> Fixture {
        let repo = Arc::new(InMemoryChatRepository::new());
        let (notices, _) = broadcast::channel(64);
        let store = Arc::new(ChatStore::open(repo.clone(), notices).await.unwrap());
        let pipeline = MessagePipeline::new(
            store.clone(),
            Arc::new(TaskScheduler::new()),
            Arc::new(responder),
            config,
        );
        Fixture {
            store,
            pipeline,
            repo,
        }
    }

    async fn new_room(store: &ChatStore) -> String {
        store
            .commit("create_room", |state| Some(state.create_room(None)))
            .await
            .value
            .unwrap()
            .id
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_then_reply() {
        let fx = fixture(FixedResponder::new(1500), ChatConfig::default()).await;
        let room = new_room(&fx.store).await;

        fx.pipeline
            .send_message(&room, Some("hi".into()), None)
            .await
            .unwrap();

        let snapshot = fx.store.snapshot();
        assert_eq!(snapshot.messages(&room).len(), 1);
        assert_eq!(snapshot.messages(&room)[0].sender, Sender::User);
        assert!(snapshot.is_typing(&room));

        tokio::time::sleep(Duration::from_millis(3100)).await;

        let snapshot = fx.store.snapshot();
        let messages = snapshot.messages(&room);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].text.as_deref(), Some("I understand your question about: hi"));
        assert!(!snapshot.is_typing(&room));
        assert_eq!(fx.pipeline.pending_count(&room), 0);
        // create, send, reply
        assert_eq!(fx.repo.save_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_content() {
        let fx = fixture(FixedResponder::new(10), ChatConfig::default()).await;
        let room = new_room(&fx.store).await;

        let err = fx
            .pipeline
            .send_message(&room, Some("   ".into()), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(fx.store.snapshot().messages(&room).is_empty());
        assert!(!fx.store.snapshot().is_typing(&room));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attachment_rules() {
        let mut config = ChatConfig::default();
        config.max_attachment_bytes = 16;
        let fx = fixture(FixedResponder::new(10), config).await;
        let room = new_room(&fx.store).await;

        let not_image = Attachment::new("application/pdf", vec![1; 4]);
        assert!(fx.pipeline.send_message(&room, None, Some(not_image)).await.is_err());

        let too_big = Attachment::new("image/png", vec![1; 17]);
        assert!(fx.pipeline.send_message(&room, None, Some(too_big)).await.is_err());

        let image = Attachment::new("image/png", vec![1; 16]);
        fx.pipeline
            .send_message(&room, None, Some(image))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let snapshot = fx.store.snapshot();
        assert_eq!(
            snapshot.messages(&room)[1].text.as_deref(),
            Some("I understand your question about: the attached image")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_room_changes_nothing() {
        let fx = fixture(FixedResponder::new(10), ChatConfig::default()).await;

        let err = fx
            .pipeline
            .send_message("missing", Some("hello".into()), None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fx.pipeline.pending_count("missing"), 0);
        assert!(fx.store.snapshot().messages_by_room.is_empty());
        assert!(!fx.pipeline.load_older_messages("missing").await);
        assert_eq!(fx.repo.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_for_deleted_room_is_discarded() {
        let fx = fixture(FixedResponder::new(2000), ChatConfig::default()).await;
        let room = new_room(&fx.store).await;

        fx.pipeline
            .send_message(&room, Some("hi".into()), None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Deleted without cancelling: the completion itself must refuse
        fx.store
            .commit("delete_room", |state| state.delete_room(&room))
            .await;
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let snapshot = fx.store.snapshot();
        assert!(!snapshot.messages_by_room.contains_key(&room));
        assert!(!snapshot.is_typing(&room));
        assert!(!fx.repo.stored().await.messages_by_room.contains_key(&room));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_room_drops_pending_replies() {
        let fx = fixture(FixedResponder::new(2000), ChatConfig::default()).await;
        let room = new_room(&fx.store).await;

        fx.pipeline.send_message(&room, Some("a".into()), None).await.unwrap();
        fx.pipeline.send_message(&room, Some("b".into()), None).await.unwrap();
        assert_eq!(fx.pipeline.pending_count(&room), 2);

        fx.pipeline.cancel_room(&room);
        assert_eq!(fx.pipeline.pending_count(&room), 0);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fx.store.snapshot().messages(&room).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_replies_land_in_completion_order() {
        let responder = FixedResponder::with_delays(&[3000, 1000]);
        let fx = fixture(responder, ChatConfig::default()).await;
        let room = new_room(&fx.store).await;

        fx.pipeline.send_message(&room, Some("first".into()), None).await.unwrap();
        fx.pipeline.send_message(&room, Some("second".into()), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let snapshot = fx.store.snapshot();
        let texts: Vec<_> = snapshot
            .messages(&room)
            .iter()
            .map(|m| m.text.clone().unwrap_or_default())
            .collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[2].contains("second"));
        // First landing reply clears the flag even though one is still pending
        assert!(!snapshot.is_typing(&room));

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let snapshot = fx.store.snapshot();
        let last = snapshot.messages(&room).last().unwrap();
        assert!(last.text.as_deref().unwrap().contains("first"));
        assert_eq!(snapshot.messages(&room).len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_older_reveals_page_after_delay() {
        let mut config = ChatConfig::default();
        config.page_size = 2;
        let fx = fixture(FixedResponder::new(10), config).await;
        let room = new_room(&fx.store).await;

        for i in 0..3 {
            fx.pipeline
                .send_message(&room, Some(format!("m{}", i)), None)
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.pipeline.visible_messages(&room).await.len(), 2);

        assert!(fx.pipeline.load_older_messages(&room).await);
        assert!(!fx.pipeline.load_older_messages(&room).await);
        assert_eq!(fx.store.snapshot().loading_older, vec![room.clone()]);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(fx.pipeline.visible_messages(&room).await.len(), 4);
        assert_eq!(fx.store.snapshot().page_by_room[&room], 2);
        assert!(fx.store.snapshot().loading_older.is_empty());
        assert!(fx.pipeline.has_older_messages(&room).await);

        assert!(fx.pipeline.load_older_messages(&room).await);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(fx.pipeline.visible_messages(&room).await.len(), 6);
        assert!(!fx.pipeline.load_older_messages(&room).await);
    }
}
