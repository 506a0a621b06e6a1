//! Domain types for the karma pipeline (§3 of the spec).
//!
//! These are semantic types, not storage types — `db.rs` owns the concrete
//! SQLite schema and maps rows to/from these structs.

use serde::{Deserialize, Serialize};

/// Stable external identifier for a chat participant. Created on first
/// sighting, never destroyed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub tg_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_bot: bool,
}

impl User {
    pub fn fullname(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// A chat the bot is tracking karma in. `chat_id` is the stable external
/// identifier; `id` is the internal primary key used as the foreign-key
/// target for owned rows (UserKarma/ChatSettings/KarmaEvent are owned by
/// Chat).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub chat_id: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatType {
    /// Gate used by C8 step 1: only group/supergroup chats run the pipeline.
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatType::Group | ChatType::Supergroup)
    }
}

/// Per-chat feature flags. `karma_counting` gates C8 entirely;
/// `karmic_restrictions` gates C7.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChatSettings {
    pub karma_counting: bool,
    pub karmic_restrictions: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            karma_counting: true,
            karmic_restrictions: false,
        }
    }
}

/// The `(User, Chat) -> karma` relation. Invariant: unique per pair.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct UserKarma {
    pub user_tg_id: i64,
    pub chat_id: i64,
    pub karma: f64,
}

/// Immutable append-only karma ledger entry. `how_change_signed` is the raw
/// sign x coefficient; `how_change_weighted` is what was actually applied
/// (the two coincide unless a future policy scales them apart).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KarmaEvent {
    pub id: String,
    pub user_from: i64,
    pub user_to: i64,
    pub chat_id: i64,
    pub how_change_signed: f64,
    pub how_change_weighted: f64,
    pub date: String,
    pub comment: String,
    pub reverted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ModeratorEventKind {
    Warn,
    Mute,
    Ban,
    AutoMute,
}

impl ModeratorEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeratorEventKind::Warn => "WARN",
            ModeratorEventKind::Mute => "MUTE",
            ModeratorEventKind::Ban => "BAN",
            ModeratorEventKind::AutoMute => "AUTO_MUTE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "WARN" => Some(ModeratorEventKind::Warn),
            "MUTE" => Some(ModeratorEventKind::Mute),
            "BAN" => Some(ModeratorEventKind::Ban),
            "AUTO_MUTE" => Some(ModeratorEventKind::AutoMute),
            _ => None,
        }
    }
}

/// A moderation action. `moderator` is `None` for system-generated
/// `AUTO_MUTE` events. `duration_secs` of `None` means permanent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModeratorEvent {
    pub id: String,
    pub moderator: Option<i64>,
    pub user_tg_id: i64,
    pub chat_id: i64,
    pub kind: ModeratorEventKind,
    pub date: String,
    pub duration_secs: Option<i64>,
    pub comment: String,
}

impl ModeratorEvent {
    /// Active iff `date + duration >= now`. A `None` duration is treated as
    /// permanent (always active).
    pub fn is_active_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        let Ok(start) = chrono::DateTime::parse_from_rfc3339(&self.date) else {
            return false;
        };
        let start = start.with_timezone(&chrono::Utc);
        match self.duration_secs {
            None => true,
            Some(secs) => start + chrono::Duration::seconds(secs) >= now,
        }
    }
}

/// `(chat, message_id) -> author` record used by C2 to resolve reaction
/// targets. Unique per `(chat, message_id)`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageAuthor {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_tg_id: i64,
    pub date: String,
}

/// Sign produced by the trigger classifier (C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSign {
    Positive,
    Negative,
    Neutral,
}

impl TriggerSign {
    pub fn as_i8(self) -> i8 {
        match self {
            TriggerSign::Positive => 1,
            TriggerSign::Negative => -1,
            TriggerSign::Neutral => 0,
        }
    }
}

/// Membership status returned by the transport's `get_chat_member` call.
/// Only these four statuses pass the membership gate (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl ChatMemberStatus {
    pub fn is_member_like(self) -> bool {
        matches!(
            self,
            ChatMemberStatus::Creator
                | ChatMemberStatus::Administrator
                | ChatMemberStatus::Member
                | ChatMemberStatus::Restricted
        )
    }
}
