use api::routes::routes;
use api::state::AppState;
use api::ws::ws_routes;
use axum::Router;
use services::recognition::RemoteRecognizer;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::config::AppConfig;

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let (log_file, log_to_stdout) = {
        let config = AppConfig::global();
        (config.log_file.clone(), config.log_to_stdout)
    };
    let _log_guard = init_logging(&log_file, log_to_stdout);

    // Set up dependencies
    let db = db::connect().await;
    let recognizer = Arc::new(RemoteRecognizer::new(db.clone()));
    let state = AppState::new(db, recognizer.clone(), recognizer);

    // Configure middleware
    let cors = CorsLayer::very_permissive();

    // Build app router
    let app = Router::new()
        .nest("/api", routes())
        .nest("/ws", ws_routes())
        .with_state(state)
        .layer(cors);

    // Start server
    let (project_name, host, port) = {
        let config = AppConfig::global();
        (config.project_name.clone(), config.host.clone(), config.port)
    };
    let addr: SocketAddr = format!("{host}:{port}").parse().expect("Invalid address");

    println!("Starting {project_name} on http://{host}:{port}");

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

fn init_logging(log_file: &str, log_to_stdout: bool) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("api=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if log_to_stdout {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}
