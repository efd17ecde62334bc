use std::sync::Arc;

use accounts::{app, config::AppConfig, state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accounts=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(id_strategy = ?config.id_strategy, "configuration loaded");

    let db = state::connect(&config).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let app_state = AppState::with_postgres(config.clone(), db)?;
    app::serve(app::build_app(app_state), &config.host, config.port).await
}
