//! Persistence layer (§3 concrete schema). Grounded directly on the
//! teacher's `Db` type: a single `Mutex<Connection>`, WAL + foreign keys,
//! idempotent `CREATE TABLE IF NOT EXISTS` / `ALTER TABLE ADD COLUMN`
//! migrations run once at startup.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

use crate::models::{
    Chat, ChatSettings, KarmaEvent, ModeratorEvent, ModeratorEventKind, User, UserKarma,
};

pub struct Db {
    pub conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to open in-memory database");
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Self {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .or_else(|_| conn.execute_batch("PRAGMA foreign_keys=ON;"))
            .expect("Failed to set pragmas");
        let db = Db {
            conn: Mutex::new(conn),
        };
        db.migrate();
        db
    }

    fn migrate(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                tg_id INTEGER PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT,
                username TEXT,
                is_bot INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_settings (
                chat_id INTEGER PRIMARY KEY REFERENCES chats(id) ON DELETE CASCADE,
                karma_counting INTEGER NOT NULL DEFAULT 1,
                karmic_restrictions INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS user_karma (
                user_tg_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                karma REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (user_tg_id, chat_id)
            );

            CREATE TABLE IF NOT EXISTS karma_events (
                id TEXT PRIMARY KEY,
                user_from INTEGER NOT NULL,
                user_to INTEGER NOT NULL,
                chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                how_change_signed REAL NOT NULL,
                how_change_weighted REAL NOT NULL,
                date TEXT NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                reverted INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_karma_events_to ON karma_events(user_to, chat_id);
            CREATE INDEX IF NOT EXISTS idx_karma_events_from_target ON karma_events(user_from, user_to, chat_id, date);
            CREATE INDEX IF NOT EXISTS idx_karma_events_from ON karma_events(user_from, chat_id, date);

            CREATE TABLE IF NOT EXISTS moderator_events (
                id TEXT PRIMARY KEY,
                moderator INTEGER,
                user_tg_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                date TEXT NOT NULL,
                duration_secs INTEGER,
                comment TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_moderator_events_user ON moderator_events(user_tg_id, chat_id);

            CREATE TABLE IF NOT EXISTS messages (
                chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                message_id INTEGER NOT NULL,
                user_tg_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                PRIMARY KEY (chat_id, message_id)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_date ON messages(date);
            ",
        )
        .expect("Failed to run migrations");
    }

    // --- Users ---

    pub fn upsert_user(&self, user: &User) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (tg_id, first_name, last_name, username, is_bot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(tg_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                username = excluded.username,
                is_bot = excluded.is_bot",
            params![
                user.tg_id,
                user.first_name,
                user.last_name,
                user.username,
                user.is_bot as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, tg_id: i64) -> rusqlite::Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT tg_id, first_name, last_name, username, is_bot FROM users WHERE tg_id = ?1",
            params![tg_id],
            |row| {
                Ok(User {
                    tg_id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    username: row.get(3)?,
                    is_bot: row.get::<_, i64>(4)? != 0,
                })
            },
        )
        .optional()
    }

    // --- Chats & settings ---

    /// Get or create a chat by its external id, returning the internal row.
    pub fn get_or_create_chat(&self, chat_id: i64) -> rusqlite::Result<Chat> {
        let conn = self.conn.lock().unwrap();
        if let Some(id) = conn
            .query_row(
                "SELECT id FROM chats WHERE chat_id = ?1",
                params![chat_id],
                |r| r.get::<_, i64>(0),
            )
            .optional()?
        {
            return Ok(Chat { id, chat_id });
        }
        conn.execute(
            "INSERT INTO chats (chat_id, created_at) VALUES (?1, ?2)",
            params![chat_id, chrono::Utc::now().to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO chat_settings (chat_id, karma_counting, karmic_restrictions) VALUES (?1, 1, 0)",
            params![id],
        )?;
        Ok(Chat { id, chat_id })
    }

    pub fn get_chat_settings(&self, chat_id: i64) -> rusqlite::Result<ChatSettings> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT karma_counting, karmic_restrictions FROM chat_settings WHERE chat_id = ?1",
            params![chat_id],
            |row| {
                Ok(ChatSettings {
                    karma_counting: row.get::<_, i64>(0)? != 0,
                    karmic_restrictions: row.get::<_, i64>(1)? != 0,
                })
            },
        )
        .optional()
        .map(|o| o.unwrap_or_default())
    }

    /// Updates a chat's moderation toggles (the `/settings` surface named by
    /// §6 is out of scope, but the flags themselves still need a mutator).
    pub fn set_chat_settings(&self, chat_id: i64, settings: &ChatSettings) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_settings (chat_id, karma_counting, karmic_restrictions)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET
                karma_counting = excluded.karma_counting,
                karmic_restrictions = excluded.karmic_restrictions",
            params![chat_id, settings.karma_counting as i64, settings.karmic_restrictions as i64],
        )?;
        Ok(())
    }

    // --- UserKarma ---

    pub fn get_user_karma(&self, user_tg_id: i64, chat_id: i64) -> rusqlite::Result<Option<UserKarma>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT karma FROM user_karma WHERE user_tg_id = ?1 AND chat_id = ?2",
            params![user_tg_id, chat_id],
            |row| {
                Ok(UserKarma {
                    user_tg_id,
                    chat_id,
                    karma: row.get(0)?,
                })
            },
        )
        .optional()
    }

    /// Percentile support: karma values of every user with a row in this
    /// chat, used by the naive C3 definition.
    pub fn all_karma_in_chat(&self, chat_id: i64) -> rusqlite::Result<Vec<(i64, f64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT user_tg_id, karma FROM user_karma WHERE chat_id = ?1")?;
        let rows = stmt
            .query_map(params![chat_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- Karma events (rate-limit aggregation) ---

    /// Sum of `|how_change_weighted|` for `user_from` in `chat_id` within
    /// `[now - window_secs, now]`, non-reverted only. Authoritative source
    /// for C5 (§5: "computed from KarmaEvent at query time").
    pub fn sum_abs_weighted_since(
        &self,
        user_from: i64,
        chat_id: i64,
        target: Option<i64>,
        since: &str,
    ) -> rusqlite::Result<f64> {
        let conn = self.conn.lock().unwrap();
        match target {
            Some(t) => conn.query_row(
                "SELECT COALESCE(SUM(ABS(how_change_weighted)), 0.0) FROM karma_events
                 WHERE user_from = ?1 AND chat_id = ?2 AND user_to = ?3 AND date >= ?4 AND reverted = 0",
                params![user_from, chat_id, t, since],
                |r| r.get(0),
            ),
            None => conn.query_row(
                "SELECT COALESCE(SUM(ABS(how_change_weighted)), 0.0) FROM karma_events
                 WHERE user_from = ?1 AND chat_id = ?2 AND date >= ?3 AND reverted = 0",
                params![user_from, chat_id, since],
                |r| r.get(0),
            ),
        }
    }

    /// Prior `AUTO_MUTE` count for a user in a chat — used by C7's escalation.
    pub fn count_prior_auto_mutes(&self, user_tg_id: i64, chat_id: i64) -> rusqlite::Result<u32> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM moderator_events WHERE user_tg_id = ?1 AND chat_id = ?2 AND kind = 'AUTO_MUTE'",
            params![user_tg_id, chat_id],
            |r| r.get::<_, i64>(0),
        )
        .map(|n| n as u32)
    }

    pub fn has_active_restriction(&self, user_tg_id: i64, chat_id: i64) -> rusqlite::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, date, duration_secs FROM moderator_events
             WHERE user_tg_id = ?1 AND chat_id = ?2 AND duration_secs IS NOT NULL",
        )?;
        let now = chrono::Utc::now();
        let rows: Vec<(String, String, Option<i64>)> = stmt
            .query_map(params![user_tg_id, chat_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, date, duration_secs) in rows {
            let ev = ModeratorEvent {
                id,
                moderator: None,
                user_tg_id,
                chat_id,
                kind: ModeratorEventKind::Mute,
                date,
                duration_secs,
                comment: String::new(),
            };
            if ev.is_active_at(now) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn get_karma_event(&self, id: &str) -> rusqlite::Result<Option<KarmaEvent>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_from, user_to, chat_id, how_change_signed, how_change_weighted, date, comment, reverted
             FROM karma_events WHERE id = ?1",
            params![id],
            |row| {
                Ok(KarmaEvent {
                    id: row.get(0)?,
                    user_from: row.get(1)?,
                    user_to: row.get(2)?,
                    chat_id: row.get(3)?,
                    how_change_signed: row.get(4)?,
                    how_change_weighted: row.get(5)?,
                    date: row.get(6)?,
                    comment: row.get(7)?,
                    reverted: row.get::<_, i64>(8)? != 0,
                })
            },
        )
        .optional()
    }

    pub fn mark_karma_event_reverted(&self, id: &str) -> rusqlite::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE karma_events SET reverted = 1 WHERE id = ?1 AND reverted = 0",
            params![id],
        )?;
        Ok(n > 0)
    }

    pub fn get_moderator_event(&self, id: &str) -> rusqlite::Result<Option<ModeratorEvent>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, moderator, user_tg_id, chat_id, kind, date, duration_secs, comment
             FROM moderator_events WHERE id = ?1",
            params![id],
            |row| {
                let kind_str: String = row.get(4)?;
                Ok(ModeratorEvent {
                    id: row.get(0)?,
                    moderator: row.get(1)?,
                    user_tg_id: row.get(2)?,
                    chat_id: row.get(3)?,
                    kind: ModeratorEventKind::from_str(&kind_str).unwrap_or(ModeratorEventKind::Mute),
                    date: row.get(5)?,
                    duration_secs: row.get(6)?,
                    comment: row.get(7)?,
                })
            },
        )
        .optional()
    }

    pub fn delete_moderator_event(&self, id: &str) -> rusqlite::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM moderator_events WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // --- Message authors (C2) ---

    pub fn store_message_author(
        &self,
        chat_id: i64,
        message_id: i64,
        user_tg_id: i64,
        date: &str,
    ) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (chat_id, message_id, user_tg_id, date) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(chat_id, message_id) DO UPDATE SET user_tg_id = excluded.user_tg_id, date = excluded.date",
            params![chat_id, message_id, user_tg_id, date],
        )?;
        Ok(())
    }

    pub fn get_message_author(&self, chat_id: i64, message_id: i64) -> rusqlite::Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_tg_id FROM messages WHERE chat_id = ?1 AND message_id = ?2",
            params![chat_id, message_id],
            |r| r.get(0),
        )
        .optional()
    }

    /// I5: delete rows older than the retention window. Returns the count deleted.
    pub fn cleanup_messages_older_than(&self, cutoff_rfc3339: &str) -> rusqlite::Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM messages WHERE date < ?1", params![cutoff_rfc3339])
    }

    // --- Karma mutation (C6) ---

    /// Apply one karma change atomically: insert the ledger row, then
    /// insert-or-add into `user_karma`. `BEGIN IMMEDIATE` is SQLite's
    /// analog to `SELECT ... FOR UPDATE` — it takes the write lock up
    /// front so two concurrent reactions on the same target serialize
    /// instead of racing on the read-modify-write (§5 I2/I3).
    pub fn apply_karma_change(&self, event: &KarmaEvent) -> rusqlite::Result<f64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO karma_events
                (id, user_from, user_to, chat_id, how_change_signed, how_change_weighted, date, comment, reverted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                event.id,
                event.user_from,
                event.user_to,
                event.chat_id,
                event.how_change_signed,
                event.how_change_weighted,
                event.date,
                event.comment,
            ],
        )?;
        tx.execute(
            "INSERT INTO user_karma (user_tg_id, chat_id, karma) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_tg_id, chat_id) DO UPDATE SET karma = karma + excluded.karma",
            params![event.user_to, event.chat_id, event.how_change_weighted],
        )?;
        let new_karma: f64 = tx.query_row(
            "SELECT karma FROM user_karma WHERE user_tg_id = ?1 AND chat_id = ?2",
            params![event.user_to, event.chat_id],
            |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(new_karma)
    }

    /// Reverse a previously-applied event: mark it reverted and subtract its
    /// delta back out of `user_karma`. Returns `None` if the event doesn't
    /// exist or was already reverted (idempotent no-op, §4.9).
    pub fn reverse_karma_event(&self, id: &str) -> rusqlite::Result<Option<f64>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let row: Option<(i64, i64, f64)> = tx
            .query_row(
                "SELECT user_to, chat_id, how_change_weighted FROM karma_events
                 WHERE id = ?1 AND reverted = 0",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        let Some((user_to, chat_id, weighted)) = row else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE karma_events SET reverted = 1 WHERE id = ?1",
            params![id],
        )?;
        tx.execute(
            "UPDATE user_karma SET karma = karma - ?1 WHERE user_tg_id = ?2 AND chat_id = ?3",
            params![weighted, user_to, chat_id],
        )?;
        let new_karma: f64 = tx.query_row(
            "SELECT karma FROM user_karma WHERE user_tg_id = ?1 AND chat_id = ?2",
            params![user_to, chat_id],
            |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some(new_karma))
    }

    // --- Moderator events (C7) ---

    pub fn insert_moderator_event(&self, ev: &ModeratorEvent) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO moderator_events (id, moderator, user_tg_id, chat_id, kind, date, duration_secs, comment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ev.id,
                ev.moderator,
                ev.user_tg_id,
                ev.chat_id,
                ev.kind.as_str(),
                ev.date,
                ev.duration_secs,
                ev.comment,
            ],
        )?;
        Ok(())
    }
}
