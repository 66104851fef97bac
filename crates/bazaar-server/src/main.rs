mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bazaar_api::state::AppStateInner;
use bazaar_db::Database;
use bazaar_notify::push::ExpoGateway;
use bazaar_notify::queue::run_worker;
use bazaar_notify::sweep::ExpirySweep;
use bazaar_notify::{FanOut, NotificationQueue};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Notification worker
    let (notifications, jobs) = NotificationQueue::new();
    let gateway = Arc::new(ExpoGateway::new(&config.push_url, config.push_access_token.clone()));
    tokio::spawn(run_worker(jobs, FanOut::new(db.clone(), gateway)));

    // Daily expiry sweep
    let sweep = ExpirySweep::new(
        db.clone(),
        notifications.clone(),
        chrono::Duration::days(config.sweep_lookahead_days),
    );
    tokio::spawn(sweep.run_daily(config.sweep_hour));

    let state = AppStateInner::new(db, config.expiry, notifications);
    let app = bazaar_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr()?;
    info!("Bazaar server listening on {} (expiry policy {:?})", addr, config.expiry);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
