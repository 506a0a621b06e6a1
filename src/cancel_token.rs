//! Tamper-resistant encoding for the cancel control's callback payload
//! (§6: `CallbackQuery.data` is "an opaque structured payload"). Since the
//! webhook surface accepts this payload back from an untrusted HTTP caller,
//! it is HMAC-signed so a forged or edited payload is rejected before C9
//! ever touches the database — the same base64/hex-encoded-HMAC idiom the
//! teacher uses for its admin/webhook tokens, reapplied here to a structured
//! value instead of a bare random string.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelPayload {
    pub user_id: i64,
    pub karma_event_id: String,
    pub rollback_karma: f64,
    pub moderator_event_id: Option<String>,
}

/// Sign a payload, producing the opaque string shipped as callback data.
pub fn encode(secret: &[u8], payload: &CancelPayload) -> String {
    let body = serde_json::to_string(payload).expect("CancelPayload always serializes");
    let body_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(body.as_bytes());
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body_b64.as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());
    format!("{body_b64}.{sig}")
}

/// Verify and decode a callback payload. Returns `None` on any malformed or
/// mismatched-signature input — callers treat that the same as "no such
/// cancel control" (§4.9: a forged token must behave exactly like an
/// unknown one, never leak *why* it was rejected).
pub fn decode(secret: &[u8], token: &str) -> Option<CancelPayload> {
    let (body_b64, sig) = token.split_once('.')?;
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body_b64.as_bytes());
    let expected = hex::decode(sig).ok()?;
    mac.verify_slice(&expected).ok()?;
    let body = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(body_b64).ok()?;
    serde_json::from_slice(&body).ok()
}
