// src/main.rs
use load_it_now::api::{self, ApiState};
use load_it_now::config::AppConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    // .env may carry RUST_LOG, so it is read before the subscriber is built.
    let dotenv = dotenvy::dotenv();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = dotenv {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let state = ApiState::from_config(&app_config);

    tracing::info!("Loading service starting...");
    if let Err(err) = api::start_api_server(&app_config.api, state).await {
        tracing::error!("API server terminated with an error: {}", err);
        std::process::exit(1);
    }
}
