// Camp Registration Backend - Web Server

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use camp_registration::{
    build_router, AppState, Config, LogNotifier, Notifier, PaystackGateway,
    ReconciliationEngine, SmtpNotifier, WebhookVerifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,camp_registration=debug".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        database = %config.database_path,
        version = camp_registration::VERSION,
        "starting camp registration server"
    );

    if config.paystack_secret_key.is_empty() {
        tracing::warn!("PAYSTACK_SECRET_KEY is not set; webhook and verify paths will reject everything");
    }

    // Open database
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("opening database at {}", config.database_path))?;
    camp_registration::setup_database(&conn)?;
    let db = Arc::new(Mutex::new(conn));

    // Outbound collaborators
    let gateway = Arc::new(PaystackGateway::new(
        &config.paystack_base_url,
        &config.paystack_secret_key,
        config.gateway_timeout_secs,
    )?);
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(server = %smtp.server, "smtp notifier enabled");
            Arc::new(SmtpNotifier::new(smtp)?)
        }
        None => {
            tracing::info!("no smtp credentials configured, mail will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let engine = Arc::new(ReconciliationEngine::new(
        db.clone(),
        gateway,
        notifier.clone(),
        config.tariff,
    ));

    let state = AppState {
        db,
        engine,
        verifier: WebhookVerifier::new(&config.paystack_secret_key),
        notifier,
        config: Arc::new(config.clone()),
    };

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%addr, "server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
