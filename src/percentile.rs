//! C3: Percentile Service (§4.3).
//!
//! Naive percentile over every `UserKarma` row in a chat: the fraction of
//! the chat's members that rank strictly above the subject. Grounded on the
//! original's `karma_percentile.py` in-memory fallback (the Postgres
//! `karma_percentile_pg.py` variant pushes the same comparison into a
//! window function; here the whole table already lives in one process so
//! there's no equivalent win to chase) — `is_user_in_top_percentile` there
//! computes `user_position = users_with_higher_karma / total_users`, with
//! `total_users` including the subject itself.

use crate::db::Db;

/// `None` when the chat has no karma rows at all (nothing to rank against).
/// Otherwise the fraction of the chat's `UserKarma` rows (including the
/// subject's own) that have strictly higher karma than the subject — so the
/// chat's single highest-karma member always ranks at `0.0` and its lowest
/// always ranks close to `1.0`.
pub fn percentile_rank(db: &Db, chat_id: i64, subject_tg_id: i64) -> rusqlite::Result<Option<f64>> {
    let rows = db.all_karma_in_chat(chat_id)?;
    let subject_karma = rows
        .iter()
        .find(|(id, _)| *id == subject_tg_id)
        .map(|(_, k)| *k);
    let Some(subject_karma) = subject_karma else {
        return Ok(None);
    };
    if rows.len() < 2 {
        return Ok(None);
    }

    let above = rows.iter().filter(|(_, k)| *k > subject_karma).count();
    Ok(Some(above as f64 / rows.len() as f64))
}
