//! C2: Message Author Registry (§4.2).
//!
//! Wraps the `messages` table in `Db` with the retention-window semantics
//! spec'd in I5, and spawns the background sweep that keeps it bounded.
//! Grounded on the teacher's `spawn_retention_task`/`run_retention` shape
//! (initial delay, then a sleep-loop `tokio::spawn`) and on the original's
//! `message_cleanup.py`, which runs the same periodic delete-older-than-cutoff
//! sweep against a single table.

use std::sync::Arc;

use crate::db::Db;

/// How often the cleanup sweep runs and how far back it keeps rows, both
/// configurable (§6).
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub retention_hours: i64,
    pub sweep_interval_hours: i64,
}

/// Record a message's author so a later reaction can resolve its target
/// (§4.2 store step).
pub fn record_author(db: &Db, chat_id: i64, message_id: i64, user_tg_id: i64) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    db.store_message_author(chat_id, message_id, user_tg_id, &now)
}

/// Resolve a message's author, fail-closed per I5: a lookup past the
/// retention window (or one that was never recorded) returns `None` rather
/// than an error, and callers treat `None` the same way either way
/// (`PipelineAbort::UnknownAuthor`).
pub fn resolve_author(db: &Db, chat_id: i64, message_id: i64) -> rusqlite::Result<Option<i64>> {
    db.get_message_author(chat_id, message_id)
}

/// Run one cleanup sweep synchronously, deleting rows older than
/// `retention_hours`. Returns the number of rows removed.
pub fn sweep_once(db: &Db, retention_hours: i64) -> rusqlite::Result<usize> {
    let cutoff = chrono::Utc::now() - chrono::Duration::hours(retention_hours);
    db.cleanup_messages_older_than(&cutoff.to_rfc3339())
}

/// Spawn the background sweep task: an initial delay to let startup settle,
/// then a sleep-loop that calls `sweep_once` on the configured interval.
/// Never overlaps itself since each iteration awaits the previous sweep and
/// the next sleep before running again (I5's "at most once concurrently").
pub fn spawn_cleanup_task(db: Arc<Db>, policy: RetentionPolicy) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        loop {
            match sweep_once(&db, policy.retention_hours) {
                Ok(n) if n > 0 => tracing::info!(deleted = n, "message registry cleanup sweep"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "message registry cleanup sweep failed"),
            }
            let interval_secs = (policy.sweep_interval_hours.max(1) as u64) * 3600;
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
        }
    });
}
