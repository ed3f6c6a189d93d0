use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use osca_notify::config::{ServerConfig, SmsConfig};
use osca_notify::sms::{SmsDispatcher, SmsState, sms_routes};
use osca_notify::store::{LibSqlBackend, RecipientStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let sms_config = SmsConfig::from_env().context("Invalid SMS configuration")?;
    let server_config = ServerConfig::from_env();

    // ── SMS providers ────────────────────────────────────────────────────
    let dispatcher = Arc::new(SmsDispatcher::from_config(&sms_config));
    let providers = dispatcher.provider_names();
    if providers.is_empty() {
        tracing::warn!("No SMS provider credentials configured; every send will fail");
    } else if !providers.iter().any(|p| p == dispatcher.default_provider()) {
        tracing::warn!(
            default = %dispatcher.default_provider(),
            configured = ?providers,
            "Default SMS provider has no credentials"
        );
    }
    tracing::info!(
        default = %dispatcher.default_provider(),
        configured = ?providers,
        "SMS providers ready"
    );

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn RecipientStore> = Arc::new(
        LibSqlBackend::new_local(&server_config.db_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    server_config.db_path.display()
                )
            })?,
    );

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = sms_routes(SmsState {
        dispatcher,
        store: Some(store),
    })
    .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(port = server_config.port, "OSCA notify server started");
    axum::serve(listener, app).await?;

    Ok(())
}
