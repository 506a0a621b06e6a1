use std::sync::Arc;

use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;

use karma_pipeline::config::Config;
use karma_pipeline::db::Db;
use karma_pipeline::models::ChatMemberStatus;
use karma_pipeline::transport::RecordingTransport;

/// Wrapper around Client that auto-deletes the temp DB on drop, in the
/// teacher's `TestClient` shape — prevents `/tmp` accumulation across runs.
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
    pub transport: Arc<RecordingTransport>,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

pub fn test_client() -> TestClient {
    test_client_with_config(Config::default())
}

pub fn test_client_with_config(config: Config) -> TestClient {
    let db_path = format!(
        "/tmp/karma_test_{}.db",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    let transport = Arc::new(RecordingTransport::new());
    let rocket = karma_pipeline::build_rocket(&db_path, config, Some(transport.clone()));
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path, transport }
}

impl TestClient {
    /// A second handle onto the same on-disk database, for tests that need
    /// to seed state (e.g. a prior `AUTO_MUTE`) the HTTP surface has no
    /// route for.
    pub fn db(&self) -> Db {
        Db::new(&self.db_path)
    }

    /// Reactors default to `Left` (not a member) in a fresh
    /// `RecordingTransport` — every reaction-sending test needs this first.
    pub fn set_member(&self, chat_id: i64, user_tg_id: i64) {
        self.transport.set_member(chat_id, user_tg_id, ChatMemberStatus::Member);
    }
}

/// Registers `user_tg_id` as the author of `message_id` in `chat_id`, the
/// way a `Message` webhook would (§6 — feeds C2).
pub fn post_message(client: &Client, chat_id: i64, message_id: i64, user_tg_id: i64) {
    let body = serde_json::json!({
        "chat_id": chat_id,
        "message_id": message_id,
        "from_user": {
            "tg_id": user_tg_id,
            "first_name": format!("user{user_tg_id}"),
            "last_name": null,
            "username": null,
            "is_bot": false,
        },
    });
    let res = client
        .post("/v1/messages")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[allow(clippy::too_many_arguments)]
pub fn post_reaction(
    client: &Client,
    chat_id: i64,
    reactor_tg_id: i64,
    message_id: i64,
    new_reaction: &[&str],
    old_reaction: &[&str],
) -> serde_json::Value {
    let body = serde_json::json!({
        "chat_id": chat_id,
        "chat_type": "Group",
        "reactor_user_id": reactor_tg_id,
        "message_id": message_id,
        "new_reaction": new_reaction,
        "old_reaction": old_reaction,
    });
    let res = client
        .post("/v1/reactions")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}

pub fn post_callback(
    client: &Client,
    from_user_id: i64,
    data: &str,
    chat_id: i64,
    notification_message_id: i64,
) -> serde_json::Value {
    let body = serde_json::json!({
        "from_user_id": from_user_id,
        "data": data,
        "chat_id": chat_id,
        "notification_message_id": notification_message_id,
    });
    let res = client
        .post("/v1/callbacks")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}
