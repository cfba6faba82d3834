use scenario_api::{app, config, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up AUTH_JWT_SECRET, table names, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting scenario API in {:?} mode", config.environment);

    // The in-memory backend serves local runs and tests; a vendor adapter
    // implementing KeyValueBackend slots in here for a managed deployment.
    let state = AppState::in_memory(config);
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("SCENARIO_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Scenario API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
