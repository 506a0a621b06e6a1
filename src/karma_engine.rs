//! C6: Karma Engine (§4.6). The transactional core: computes a reactor's
//! weighted delta, applies every host-policy gate, writes the ledger entry,
//! and hands the before/after pair to C7.

use uuid::Uuid;

use crate::auto_restriction;
use crate::config::Config;
use crate::db::Db;
use crate::error::PipelineAbort;
use crate::models::{KarmaEvent, TriggerSign};

/// Outcome of one `apply()` call (§4.6 step 9).
#[derive(Debug, Clone)]
pub struct KarmaOutcome {
    pub karma_event_id: String,
    pub karma_after: f64,
    pub delta_applied: f64,
    pub was_auto_restricted: bool,
    pub auto_restrict_count: u32,
    pub moderator_event_id: Option<String>,
    pub mute_duration_secs: Option<i64>,
}

/// `sign` is the already-summed trigger sign (§4.8 step 4); this function
/// does not re-derive it. `target_is_bot` and `karmic_restrictions` are
/// caller-supplied since they come from state C6 doesn't own (User/ChatSettings).
#[allow(clippy::too_many_arguments)]
pub fn apply(
    db: &Db,
    config: &Config,
    chat_id: i64,
    reactor_tg_id: i64,
    target_tg_id: i64,
    sign: TriggerSign,
    target_is_bot: bool,
    karmic_restrictions: bool,
    comment: &str,
) -> Result<KarmaOutcome, PipelineAbort> {
    // Step 4: CANT_CHANGE_KARMA.
    if reactor_tg_id == target_tg_id {
        return Err(PipelineAbort::CantChangeKarma);
    }
    if target_is_bot && !config.can_be_bot {
        return Err(PipelineAbort::CantChangeKarma);
    }

    // Step 1: load karma_before for reactor (drives power) and target.
    let reactor_karma = db.get_user_karma(reactor_tg_id, chat_id)?.map(|k| k.karma).unwrap_or(0.0);
    let karma_before_target = db.get_user_karma(target_tg_id, chat_id)?.map(|k| k.karma).unwrap_or(0.0);

    // Step 2-3: reactor power and raw delta.
    let reactor_power = config.power(reactor_karma);
    let delta = sign.as_i8() as f64 * reactor_power * config.reaction_coefficient;

    // Step 5: DONT_OFFEND_RESTRICTED.
    if delta < 0.0 && db.has_active_restriction(target_tg_id, chat_id)? {
        return Err(PipelineAbort::DontOffendRestricted);
    }

    // Step 6: SUB_ZERO_KARMA (reciprocal bookkeeping, off by default).
    if config.debit_reactor_on_negative && delta < 0.0 && reactor_karma + delta < 0.0 {
        return Err(PipelineAbort::SubZeroKarma);
    }

    // Step 7: write the ledger entry and update UserKarma.
    let event = KarmaEvent {
        id: Uuid::new_v4().to_string(),
        user_from: reactor_tg_id,
        user_to: target_tg_id,
        chat_id,
        how_change_signed: delta,
        how_change_weighted: delta,
        date: chrono::Utc::now().to_rfc3339(),
        comment: comment.to_string(),
        reverted: false,
    };
    let karma_after = db.apply_karma_change(&event)?;
    debug_assert!((karma_after - (karma_before_target + delta)).abs() < 1e-9);

    // Step 8: C7.
    let restriction = if karmic_restrictions {
        auto_restriction::evaluate(db, config, chat_id, target_tg_id, karma_before_target, karma_after)?
    } else {
        auto_restriction::Outcome::default()
    };

    Ok(KarmaOutcome {
        karma_event_id: event.id,
        karma_after,
        delta_applied: delta,
        was_auto_restricted: restriction.was_auto_restricted,
        auto_restrict_count: restriction.auto_restrict_count,
        moderator_event_id: restriction.moderator_event_id,
        mute_duration_secs: restriction.mute_duration_secs,
    })
}
