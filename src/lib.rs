pub mod auto_restriction;
pub mod cancel_token;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod karma_engine;
pub mod message_registry;
pub mod models;
pub mod percentile;
pub mod pipeline;
pub mod rate_limit;
pub mod reversal;
pub mod routes;
pub mod transport;

use std::env;
use std::sync::Arc;

use config::Config;
use db::Db;
use message_registry::RetentionPolicy;
use rocket_cors::CorsOptions;
use routes::CancelSecret;
use transport::Transport;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "data/karma.db".to_string());
    rocket_with_db(&db_path)
}

pub fn rocket_with_db(db_path: &str) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, Config::from_env(), None)
}

/// Build with an explicit transport — the seam the real chat adapter would
/// plug into; tests and the default binary use `None` to fall back to
/// `RecordingTransport`.
pub fn build_rocket(
    db_path: &str,
    config: Config,
    transport: Option<Arc<dyn Transport>>,
) -> rocket::Rocket<rocket::Build> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Db::new(db_path);
    let db = Arc::new(db);
    let transport: Arc<dyn Transport> =
        transport.unwrap_or_else(|| Arc::new(transport::RecordingTransport::new()));

    let cancel_secret = env::var("CANCEL_TOKEN_SECRET")
        .unwrap_or_else(|_| "dev-insecure-cancel-secret".to_string())
        .into_bytes();

    let retention_policy = RetentionPolicy {
        retention_hours: config.message_retention_hours,
        sweep_interval_hours: config.cleanup_interval_hours,
    };

    let cors = CorsOptions::default()
        .to_cors()
        .expect("failed to build CORS configuration");

    let cleanup_db = db.clone();
    rocket::build()
        .manage(db)
        .manage(config)
        .manage(transport)
        .manage(CancelSecret(cancel_secret))
        .attach(cors)
        .register("/v1", rocket::catchers![routes::too_many_requests, routes::not_found])
        .mount(
            "/v1",
            rocket::routes![
                routes::health,
                routes::post_reaction,
                routes::post_message,
                routes::post_callback,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Message Registry Cleanup", move |_rocket| {
            Box::pin(async move {
                message_registry::spawn_cleanup_task(cleanup_db, retention_policy);
                tracing::info!("message registry cleanup task started");
            })
        }))
}
