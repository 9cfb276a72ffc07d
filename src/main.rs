mod analysis;
mod app;
mod auth;
mod classifier;
mod config;
mod entries;
mod error;
mod nutrition;
mod session;
mod state;
mod store;
mod summary;
mod system;

use tracing::{info, warn};

use crate::state::AppState;

const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "demo123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutriassist=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if app_state.config.seed_demo_user {
        seed_demo_user(&app_state).await?;
    }

    let (host, port) = (app_state.config.host.clone(), app_state.config.port);
    app::serve(app::build_app(app_state), &host, port).await
}

async fn seed_demo_user(state: &AppState) -> anyhow::Result<()> {
    if state.store.user_exists(DEMO_EMAIL).await? {
        return Ok(());
    }
    match state.store.create_user(DEMO_EMAIL, DEMO_PASSWORD, "Demo").await {
        Ok(user) => info!(user_id = %user.id, email = DEMO_EMAIL, "demo user created"),
        Err(e) => warn!(error = %e, "demo user not created"),
    }
    Ok(())
}
