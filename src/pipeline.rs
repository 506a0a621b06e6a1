//! C8: Reaction Pipeline (§4.8). Orchestrates C1-C7 for one inbound
//! `MessageReactionUpdated` event, in the exact short-circuiting order the
//! spec lays out.

use crate::cancel_token::{self, CancelPayload};
use crate::classifier;
use crate::config::Config;
use crate::db::Db;
use crate::error::PipelineAbort;
use crate::gate;
use crate::karma_engine;
use crate::message_registry;
use crate::models::{ChatType, TriggerSign};
use crate::percentile;
use crate::rate_limit;
use crate::transport::{OutgoingMessage, Transport};

#[derive(Debug, Clone)]
pub struct ReactionUpdate {
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub reactor_tg_id: i64,
    pub message_id: i64,
    pub new_reactions: Vec<String>,
    pub old_reactions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReactionResult {
    pub karma_event_id: String,
    pub target_tg_id: i64,
    pub karma_after: f64,
    pub delta_applied: f64,
    pub reply_text: String,
    pub cancel_token: String,
    pub notice_message_id: Option<i64>,
}

/// Run the full pipeline for one reaction update. `Ok(None)` means the
/// pipeline ran to a silent abort (§4.8: "no user error unless noted");
/// `Err` surfaces only the two user-visible aborts (low percentile, rate
/// limited) so the caller can still notify, and anything else propagates
/// as a hard error only for unexpected database/transport failures.
pub fn handle(
    db: &Db,
    transport: &dyn Transport,
    config: &Config,
    cancel_secret: &[u8],
    update: &ReactionUpdate,
) -> Result<Option<ReactionResult>, PipelineAbort> {
    match run(db, transport, config, cancel_secret, update) {
        Ok(result) => Ok(Some(result)),
        Err(abort) if abort.is_user_visible() => Err(abort),
        Err(abort) => {
            match abort.log_level() {
                tracing::Level::ERROR => tracing::error!(%abort, "reaction pipeline aborted"),
                tracing::Level::INFO => tracing::info!(%abort, "reaction pipeline aborted"),
                _ => tracing::debug!(%abort, "reaction pipeline aborted"),
            }
            Ok(None)
        }
    }
}

/// The straight-line version of §4.8: every abort, visible or not, is a
/// plain early return here. `handle` is the one place that decides which
/// aborts reach the caller.
fn run(
    db: &Db,
    transport: &dyn Transport,
    config: &Config,
    cancel_secret: &[u8],
    update: &ReactionUpdate,
) -> Result<ReactionResult, PipelineAbort> {
    // Step 1.
    if !update.chat_type.is_group_like() {
        return Err(PipelineAbort::KarmaCountingDisabled);
    }
    let chat = db.get_or_create_chat(update.chat_id)?;
    let settings = db.get_chat_settings(chat.id)?;
    if !settings.karma_counting {
        return Err(PipelineAbort::KarmaCountingDisabled);
    }

    // Step 2.
    let target_tg_id = message_registry::resolve_author(db, update.chat_id, update.message_id)?
        .ok_or(PipelineAbort::UnknownAuthor)?;

    // Step 3.
    let target = db.get_user(target_tg_id)?;
    let target_is_bot = target.as_ref().map(|u| u.is_bot).unwrap_or(false);
    if update.reactor_tg_id == target_tg_id {
        return Err(PipelineAbort::SelfReaction);
    }
    if target_is_bot && !config.can_be_bot {
        return Err(PipelineAbort::BotTarget);
    }

    // Step 4.
    let (sign, emojis) = classify_and_sum(&update.new_reactions, &update.old_reactions);
    let sign = sign.ok_or(PipelineAbort::NeutralReaction)?;
    let comment = format!("(reaction {emojis})");

    // Step 5.
    if let Some(actual) = percentile::percentile_rank(db, update.chat_id, update.reactor_tg_id)?
        && actual >= config.required_percentile
    {
        return Err(PipelineAbort::LowPercentile {
            actual,
            required: config.required_percentile,
        });
    }

    // Step 6.
    gate::check_reactor(db, transport, update.chat_id, update.reactor_tg_id)?;

    // Step 7 (needs reactor power, computed by C6 too, so compute once here
    // for the rate check and let C6 recompute under its own transaction —
    // cheap, and avoids threading a pre-transaction value across the gate).
    let reactor_karma = db
        .get_user_karma(update.reactor_tg_id, update.chat_id)?
        .map(|k| k.karma)
        .unwrap_or(0.0);
    let reactor_power = config.power(reactor_karma);
    rate_limit::check(
        db,
        update.chat_id,
        update.reactor_tg_id,
        target_tg_id,
        reactor_power,
        &config.rate_limits_per_target,
        &config.rate_limits_global,
    )?;

    // Step 8.
    let outcome = karma_engine::apply(
        db,
        config,
        update.chat_id,
        update.reactor_tg_id,
        target_tg_id,
        sign,
        target_is_bot,
        settings.karmic_restrictions,
        &comment,
    )?;

    // Step 8 (cont'd): carry out the mute C7 decided on.
    if let Some(duration_secs) = outcome.mute_duration_secs {
        let until = chrono::Utc::now() + chrono::Duration::seconds(duration_secs);
        let _ = transport.restrict_chat_member(update.chat_id, target_tg_id, Some(until));
    }

    // Step 9: reply + cancel control.
    let reply_text = format!(
        "{:+.2} ({:.2} total)",
        outcome.delta_applied, outcome.karma_after
    );
    let payload = CancelPayload {
        user_id: update.reactor_tg_id,
        karma_event_id: outcome.karma_event_id.clone(),
        rollback_karma: -outcome.delta_applied,
        moderator_event_id: outcome.moderator_event_id.clone(),
    };
    let cancel_token = cancel_token::encode(cancel_secret, &payload);
    let notice_message_id = transport
        .send_message(OutgoingMessage {
            chat_id: update.chat_id,
            text: reply_text.clone(),
            reply_to_message_id: Some(update.message_id),
        })
        .ok();

    Ok(ReactionResult {
        karma_event_id: outcome.karma_event_id,
        target_tg_id,
        karma_after: outcome.karma_after,
        delta_applied: outcome.delta_applied,
        reply_text,
        cancel_token,
        notice_message_id,
    })
}

/// §4.8 step 4: sum positive/negative signs across added and removed
/// reactions (removed reactions contribute their negated sign), returning
/// `None` if the total is zero.
fn classify_and_sum(new_reactions: &[String], old_reactions: &[String]) -> (Option<TriggerSign>, String) {
    let mut total = 0i64;
    let mut emojis = Vec::new();
    for token in new_reactions {
        let sign = classifier::classify(token);
        total += sign.as_i8() as i64;
        if sign != TriggerSign::Neutral {
            emojis.push(token.clone());
        }
    }
    for token in old_reactions {
        let sign = classifier::classify(token);
        total -= sign.as_i8() as i64;
    }
    let sign = match total.cmp(&0) {
        std::cmp::Ordering::Greater => Some(TriggerSign::Positive),
        std::cmp::Ordering::Less => Some(TriggerSign::Negative),
        std::cmp::Ordering::Equal => None,
    };
    (sign, emojis.join(""))
}
