//! The webhook-style ingestion surface (§6): this is scaffolding for the
//! documented transport boundary, not a reimplementation of the excluded
//! real chat adapter. A real integration would translate Telegram/Matrix/etc.
//! updates into these request bodies and call `Transport` for replies.

mod callbacks;
mod messages;
mod reactions;
mod system;

pub use callbacks::post_callback;
pub use messages::post_message;
pub use reactions::post_reaction;
pub use system::{health, not_found, too_many_requests};

/// The HMAC secret used to sign/verify cancel tokens (§4.9), managed as
/// Rocket state rather than read from env on every request.
pub struct CancelSecret(pub Vec<u8>);
