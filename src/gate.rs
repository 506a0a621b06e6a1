//! C4: Membership & Restriction Gate (§4.4).

use crate::db::Db;
use crate::error::PipelineAbort;
use crate::transport::Transport;

/// Confirms the reactor is a member-like participant of the chat and has no
/// active restriction. Short-circuits with the first applicable abort —
/// membership is checked before restriction per §4.4's ordering.
pub fn check_reactor(
    db: &Db,
    transport: &dyn Transport,
    chat_id: i64,
    reactor_tg_id: i64,
) -> Result<(), PipelineAbort> {
    let status = transport
        .get_chat_member(chat_id, reactor_tg_id)
        .map_err(PipelineAbort::Transport)?;
    if !status.is_member_like() {
        return Err(PipelineAbort::NotAMember);
    }
    if db.has_active_restriction(reactor_tg_id, chat_id)? {
        return Err(PipelineAbort::RestrictedReactor);
    }
    Ok(())
}
