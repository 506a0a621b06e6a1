use std::sync::Arc;

use rocket::post;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::cancel_token;
use crate::db::Db;
use crate::reversal;
use crate::routes::CancelSecret;
use crate::transport::Transport;

/// §6: `CallbackQuery { from_user, data }` where `data` is the opaque
/// token minted in C8 step 9. `notification_chat_id`/`notification_message_id`
/// identify the message the undo should delete — Telegram's own callback
/// carries this implicitly via the originating message, which a real
/// transport adapter would supply; the webhook body makes it explicit.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub from_user_id: i64,
    pub data: String,
    pub chat_id: i64,
    pub notification_message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub reverted: bool,
    pub karma_after: Option<f64>,
}

#[post("/callbacks", data = "<body>")]
pub fn post_callback(
    body: Json<CallbackBody>,
    db: &State<Arc<Db>>,
    secret: &State<CancelSecret>,
    transport: &State<Arc<dyn Transport>>,
) -> Json<CallbackResponse> {
    let Some(payload) = cancel_token::decode(&secret.0, &body.data) else {
        return Json(CallbackResponse { reverted: false, karma_after: None });
    };
    // §4.9: only the original reactor may activate the cancel control.
    if payload.user_id != body.from_user_id {
        return Json(CallbackResponse { reverted: false, karma_after: None });
    }

    match reversal::undo(
        db.inner().as_ref(),
        transport.inner().as_ref(),
        body.chat_id,
        &payload.karma_event_id,
        payload.moderator_event_id.as_deref(),
        body.chat_id,
        body.notification_message_id,
    ) {
        Ok(Some(outcome)) => Json(CallbackResponse {
            reverted: true,
            karma_after: Some(outcome.karma_after),
        }),
        Ok(None) => Json(CallbackResponse { reverted: false, karma_after: None }),
        Err(e) => {
            tracing::error!(error = %e, "undo failed");
            Json(CallbackResponse { reverted: false, karma_after: None })
        }
    }
}
