use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use jot_api::auth::Verifier;
use jot_push::scanner::Scanner;
use jot_server::{Config, app, build_state, cors_layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jot=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(jot_db::Database::open(&PathBuf::from(&config.db_path))?);

    let verifier = Verifier::new(config.tokeninfo_url.clone());
    let (state, _registry, notifier) = build_state(db.clone(), verifier, config.stream_ttl);

    let scanner = Scanner::spawn(db, notifier, config.scan_interval);

    let router = app(state, cors_layer(&config.cors_origins)?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("jot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    // Stop the reminder scanner before the process exits
    scanner.shutdown().await;

    Ok(())
}
