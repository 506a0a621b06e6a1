use rocket::launch;

#[launch]
fn rocket() -> _ {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    karma_pipeline::rocket()
}
