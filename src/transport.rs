//! Abstraction boundary to the out-of-scope chat transport (spec.md §2
//! Non-goals: "the actual messaging transport/bot framework integration").
//! Everything downstream of C8 talks to the outside world only through this
//! trait, so the pipeline and its tests never depend on a real bot client.

use crate::models::ChatMemberStatus;

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    /// Set when the message should be deletable later (§4.9 undo window).
    pub reply_to_message_id: Option<i64>,
}

pub trait Transport: Send + Sync {
    fn get_chat_member(&self, chat_id: i64, user_tg_id: i64) -> Result<ChatMemberStatus, String>;

    /// Returns the transport's message id for the sent message, so a later
    /// undo can delete it (§4.9).
    fn send_message(&self, msg: OutgoingMessage) -> Result<i64, String>;

    fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_tg_id: i64,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), String>;

    fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String>;
}

/// Test double that records every call instead of reaching a real chat
/// backend. Membership/restriction responses are seeded per-user so tests
/// can drive every branch of C4.
#[derive(Default)]
pub struct RecordingTransport {
    pub members: std::sync::Mutex<std::collections::HashMap<(i64, i64), ChatMemberStatus>>,
    pub sent: std::sync::Mutex<Vec<OutgoingMessage>>,
    pub restrictions: std::sync::Mutex<Vec<(i64, i64, Option<chrono::DateTime<chrono::Utc>>)>>,
    pub deleted: std::sync::Mutex<Vec<(i64, i64)>>,
    next_message_id: std::sync::atomic::AtomicI64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_member(&self, chat_id: i64, user_tg_id: i64, status: ChatMemberStatus) {
        self.members
            .lock()
            .unwrap()
            .insert((chat_id, user_tg_id), status);
    }
}

impl Transport for RecordingTransport {
    fn get_chat_member(&self, chat_id: i64, user_tg_id: i64) -> Result<ChatMemberStatus, String> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&(chat_id, user_tg_id))
            .copied()
            .unwrap_or(ChatMemberStatus::Left))
    }

    fn send_message(&self, msg: OutgoingMessage) -> Result<i64, String> {
        let id = self
            .next_message_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.sent.lock().unwrap().push(msg);
        Ok(id)
    }

    fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_tg_id: i64,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), String> {
        self.restrictions.lock().unwrap().push((chat_id, user_tg_id, until));
        Ok(())
    }

    fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }
}
