//! C5: Rate Limiter (§4.5).
//!
//! Authoritative over `KarmaEvent` rows, not an in-memory window — the
//! teacher's `RateLimiter` counts in-process `Instant`s, but §5 requires
//! these counts to be derivable purely from ledger state (so a restart, or
//! a second process, sees the same limit). The shape this keeps from the
//! teacher is the ordered-windows-with-defaults config idiom; what changes
//! is the storage backing each check.

use crate::config::RateWindow;
use crate::db::Db;
use crate::error::{PipelineAbort, RateLimitScope};

/// Evaluate the per-target chain, then the global chain (§4.8 step 7). Each
/// window passes iff `total_weighted < rate * reactor_power`; failing any
/// window aborts with the offending window's details.
pub fn check(
    db: &Db,
    chat_id: i64,
    reactor_tg_id: i64,
    target_tg_id: i64,
    reactor_power: f64,
    per_target_windows: &[RateWindow],
    global_windows: &[RateWindow],
) -> Result<(), PipelineAbort> {
    for window in per_target_windows {
        check_one(db, chat_id, reactor_tg_id, Some(target_tg_id), reactor_power, *window, RateLimitScope::PerTarget)?;
    }
    for window in global_windows {
        check_one(db, chat_id, reactor_tg_id, None, reactor_power, *window, RateLimitScope::Global)?;
    }
    Ok(())
}

fn check_one(
    db: &Db,
    chat_id: i64,
    reactor_tg_id: i64,
    target_tg_id: Option<i64>,
    reactor_power: f64,
    window: RateWindow,
    scope: RateLimitScope,
) -> Result<(), PipelineAbort> {
    let since = (chrono::Utc::now() - chrono::Duration::seconds(window.window_secs)).to_rfc3339();
    let total = db.sum_abs_weighted_since(reactor_tg_id, chat_id, target_tg_id, &since)?;
    let budget = window.rate * reactor_power;
    if total >= budget {
        return Err(PipelineAbort::RateLimited {
            scope,
            rate: window.rate,
            window_secs: window.window_secs,
        });
    }
    Ok(())
}
