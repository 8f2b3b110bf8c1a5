use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elms_api::config::ServerConfig;
use elms_api::router::build_app_router;
use elms_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let pool = connect_database().await;

    let app = build_app_router(AppState::new(pool, config.clone()), &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be a valid address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Cannot bind {addr}: {e}"));
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Shutdown complete");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elms_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect, ping, and migrate. Any failure here is fatal: the server has
/// nothing to serve without its database.
async fn connect_database() -> elms_db::DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = elms_db::create_pool(&url)
        .await
        .expect("Failed to connect to database");
    elms_db::health_check(&pool)
        .await
        .expect("Database did not answer the health probe");
    elms_db::run_migrations(&pool)
        .await
        .expect("Failed to apply migrations");
    tracing::info!("Database ready, migrations applied");

    pool
}

/// Resolve on SIGINT or SIGTERM so in-flight requests get to finish
/// whether the stop comes from a terminal or a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, draining"),
        () = terminate => tracing::info!("SIGTERM received, draining"),
    }
}
