use contable_auth::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "contable_auth=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init()?;
    tracing::info!(
        algorithm = ?app_state.config.jwt.algorithm,
        ttl_minutes = app_state.config.jwt.ttl_minutes,
        "auth service configured"
    );

    let host = app_state.config.server.host.clone();
    let port = app_state.config.server.port;
    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
