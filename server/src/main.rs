mod cli;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use config::{AppConfig, StoreBackend};
use reconciler::Reconciler;
use routes::AppState;
use store::audit::AuditLog;
use store::{InvoiceStore, MemoryInvoiceStore, SledInvoiceStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn InvoiceStore>> {
    match cfg.store.backend {
        StoreBackend::Sled => {
            if let Some(parent) = cfg.store.path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            tracing::info!(path=%cfg.store.path.display(), "Using sled invoice store");
            let store = SledInvoiceStore::open(&cfg.store.path)
                .with_context(|| format!("opening store at {}", cfg.store.path.display()))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory invoice store; records are lost on restart");
            Ok(Arc::new(MemoryInvoiceStore::new()))
        }
    }
}

fn build_state(cfg: &AppConfig, store: Arc<dyn InvoiceStore>) -> anyhow::Result<AppState> {
    let webhook_secret = config::webhook_secret();
    if cfg.webhook.require_auth && webhook_secret.is_none() {
        anyhow::bail!("webhook.require_auth is set but no webhook secret is configured");
    }
    if webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured; deliveries are not authenticated");
    }

    let audit = if cfg.audit.enabled {
        AuditLog::to_file(&cfg.audit.path)
    } else {
        AuditLog::disabled()
    };
    let reconciler = Reconciler::new(Arc::clone(&store)).with_audit(audit.clone());

    Ok(AppState {
        store,
        reconciler: Arc::new(reconciler),
        audit,
        webhook_secret,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=%e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load()?;
    match cli.command() {
        Command::Serve => serve(cfg).await,
        Command::InitConfig => {
            config::store(&cfg)?;
            tracing::info!("Configuration written");
            Ok(())
        }
        Command::SetWebhookSecret { secret } => {
            config::set_webhook_secret(secret)?;
            tracing::info!("Webhook secret stored in keychain");
            Ok(())
        }
        Command::ClearWebhookSecret => {
            config::clear_webhook_secret()?;
            tracing::info!("Webhook secret removed from keychain");
            Ok(())
        }
    }
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let store = open_store(&cfg)?;
    let state = build_state(&cfg, Arc::clone(&store))?;

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server is running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await?;
    Ok(())
}
