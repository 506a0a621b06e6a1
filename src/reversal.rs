//! C9: Reversal/Undo (§4.9). Activated from a verified `CancelPayload`;
//! this module trusts that the caller (the callback route) has already
//! confirmed `payload.user_id == callback.from_user` (§4.9: "only the
//! original reactor may activate it").

use crate::db::Db;
use crate::error::PipelineAbort;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct UndoOutcome {
    pub karma_after: f64,
    pub moderator_event_lifted: bool,
}

/// Reverse a previously-applied karma change. Idempotent: re-activating an
/// already-reverted event fails closed with `UnknownAuthor`-shaped silence
/// rather than double-crediting (§4.9 step 1 implies a once-only inverse).
pub fn undo(
    db: &Db,
    transport: &dyn Transport,
    chat_id: i64,
    karma_event_id: &str,
    moderator_event_id: Option<&str>,
    notification_chat_id: i64,
    notification_message_id: i64,
) -> Result<Option<UndoOutcome>, PipelineAbort> {
    let Some(karma_after) = db.reverse_karma_event(karma_event_id)? else {
        return Ok(None);
    };

    let mut moderator_event_lifted = false;
    if let Some(mod_id) = moderator_event_id
        && let Some(ev) = db.get_moderator_event(mod_id)?
        && ev.is_active_at(chrono::Utc::now())
    {
        db.delete_moderator_event(mod_id)?;
        transport
            .restrict_chat_member(chat_id, ev.user_tg_id, None)
            .map_err(PipelineAbort::Transport)?;
        moderator_event_lifted = true;
    }

    // Best-effort per §5: log, don't retry, on failure to delete.
    if let Err(e) = transport.delete_message(notification_chat_id, notification_message_id) {
        tracing::warn!(error = %e, "failed to delete cancel notification message");
    }

    Ok(Some(UndoOutcome {
        karma_after,
        moderator_event_lifted,
    }))
}
