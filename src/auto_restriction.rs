//! C7: Auto-Restriction Policy (§4.7). Invoked by C6 with the target's
//! karma before and after one karma change; decides whether to emit a
//! first-crossing notice or escalate to an `AUTO_MUTE`.

use uuid::Uuid;

use crate::config::Config;
use crate::db::Db;
use crate::error::PipelineAbort;
use crate::models::{ModeratorEvent, ModeratorEventKind};

#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub was_auto_restricted: bool,
    pub auto_restrict_count: u32,
    pub moderator_event_id: Option<String>,
    /// Set when a first-crossing notice should be sent; the caller (C8) owns
    /// transport dispatch, this module only decides that it should happen.
    pub first_crossing_notice: bool,
    pub mute_duration_secs: Option<i64>,
}

pub fn evaluate(
    db: &Db,
    config: &Config,
    chat_id: i64,
    target_tg_id: i64,
    karma_before: f64,
    karma_after: f64,
) -> Result<Outcome, PipelineAbort> {
    // First crossing: notify only, no restriction.
    if karma_before >= 0.0 && karma_after < 0.0 {
        return Ok(Outcome {
            first_crossing_notice: true,
            ..Outcome::default()
        });
    }

    // Already negative and dropping further, with prior history: escalate.
    if karma_before < 0.0 && karma_after < karma_before {
        let prior_count = db.count_prior_auto_mutes(target_tg_id, chat_id)?;
        if prior_count >= 1 {
            let duration_secs = config.auto_restriction.duration_for(prior_count);
            let event = ModeratorEvent {
                id: Uuid::new_v4().to_string(),
                moderator: None,
                user_tg_id: target_tg_id,
                chat_id,
                kind: ModeratorEventKind::AutoMute,
                date: chrono::Utc::now().to_rfc3339(),
                duration_secs: Some(duration_secs),
                comment: String::new(),
            };
            db.insert_moderator_event(&event)?;
            return Ok(Outcome {
                was_auto_restricted: true,
                auto_restrict_count: prior_count + 1,
                moderator_event_id: Some(event.id),
                first_crossing_notice: false,
                mute_duration_secs: Some(duration_secs),
            });
        }
    }

    Ok(Outcome::default())
}
