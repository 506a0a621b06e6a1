use std::sync::Arc;

use rocket::post;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::Db;
use crate::models::ChatType;
use crate::pipeline::{self, ReactionUpdate};
use crate::routes::CancelSecret;
use crate::transport::Transport;

#[derive(Debug, Deserialize)]
pub struct ReactionUpdateBody {
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub reactor_user_id: i64,
    pub message_id: i64,
    #[serde(default)]
    pub new_reaction: Vec<String>,
    #[serde(default)]
    pub old_reaction: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub applied: bool,
    pub reason: Option<String>,
    pub karma_after: Option<f64>,
    pub delta_applied: Option<f64>,
    pub reply_text: Option<String>,
    pub cancel_token: Option<String>,
}

#[post("/reactions", data = "<body>")]
pub fn post_reaction(
    body: Json<ReactionUpdateBody>,
    db: &State<Arc<Db>>,
    config: &State<Config>,
    secret: &State<CancelSecret>,
    transport: &State<Arc<dyn Transport>>,
) -> Json<ReactionResponse> {
    let update = ReactionUpdate {
        chat_id: body.chat_id,
        chat_type: body.chat_type,
        reactor_tg_id: body.reactor_user_id,
        message_id: body.message_id,
        new_reactions: body.new_reaction.clone(),
        old_reactions: body.old_reaction.clone(),
    };

    match pipeline::handle(db.inner().as_ref(), transport.inner().as_ref(), config, &secret.0, &update) {
        Ok(Some(result)) => Json(ReactionResponse {
            applied: true,
            reason: None,
            karma_after: Some(result.karma_after),
            delta_applied: Some(result.delta_applied),
            reply_text: Some(result.reply_text),
            cancel_token: Some(result.cancel_token),
        }),
        Ok(None) => Json(ReactionResponse {
            applied: false,
            reason: None,
            karma_after: None,
            delta_applied: None,
            reply_text: None,
            cancel_token: None,
        }),
        Err(abort) => {
            // §7: the two user-visible aborts get a transient notice; the
            // real transport decides how/when to delete it, we only send.
            let _ = transport.send_message(crate::transport::OutgoingMessage {
                chat_id: body.chat_id,
                text: abort.to_string(),
                reply_to_message_id: Some(body.message_id),
            });
            Json(ReactionResponse {
                applied: false,
                reason: Some(abort.to_string()),
                karma_after: None,
                delta_applied: None,
                reply_text: None,
                cancel_token: None,
            })
        }
    }
}
