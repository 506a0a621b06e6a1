use std::sync::Arc;

use rocket::post;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;

use crate::db::Db;
use crate::message_registry;
use crate::models::User;

/// Feeds C2 (§6: "a `Message` event ... feeds C2 via a message-observer
/// collaborator"). Upserts the author's user row and records them as this
/// message's author so a later reaction can resolve its target.
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub chat_id: i64,
    pub message_id: i64,
    pub from_user: User,
}

#[post("/messages", data = "<body>")]
pub fn post_message(body: Json<MessageBody>, db: &State<Arc<Db>>) -> Json<serde_json::Value> {
    let db: &Db = db.inner().as_ref();
    if let Err(e) = db.upsert_user(&body.from_user) {
        tracing::error!(error = %e, "failed to upsert message author");
        return Json(serde_json::json!({"stored": false}));
    }
    if let Err(e) = message_registry::record_author(db, body.chat_id, body.message_id, body.from_user.tg_id) {
        tracing::error!(error = %e, "failed to record message author");
        return Json(serde_json::json!({"stored": false}));
    }
    Json(serde_json::json!({"stored": true}))
}
