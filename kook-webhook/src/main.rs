//! KOOK webhook server.
//!
//! Serves the push webhook and logs every text and KMarkdown message it
//! receives. Embedders register their own handlers on a `HandlerRegistry`
//! before building the router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kook_webhook::api::{fetch_bot_user, HttpTransport};
use kook_webhook::signal::is_verification_enabled;
use kook_webhook::{event_type, router, AppState, Config, Event, HandlerRegistry, WebhookReceiver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    config.validate()?;
    info!(
        port = config.port,
        webhook_path = %config.webhook_path,
        encrypt_key_configured = config.encrypt_key.is_some(),
        verify_token_configured = config.verify_token.is_some(),
        bot_token_configured = config.bot_token.is_some(),
        handler_concurrency = config.handler_concurrency,
        "config_loaded"
    );

    if !is_verification_enabled(config.verify_token.as_deref()) {
        warn!("verify_token_not_configured");
    }

    if let Some(token) = &config.bot_token {
        log_bot_identity(&config, token).await;
    }

    let registry = HandlerRegistry::new();
    for kind in [event_type::TEXT, event_type::KMARKDOWN] {
        registry.register(kind, log_message).await;
    }

    let receiver = WebhookReceiver::new(&config, registry);
    let state = AppState::new(config.clone(), receiver);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, path = %config.webhook_path, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

async fn log_message(event: Arc<Event>) -> Result<()> {
    info!(
        event_type = event.event_type,
        channel_type = %event.channel_type,
        target_id = %event.target_id,
        author_id = %event.author_id,
        msg_id = %event.msg_id,
        content = %event.content,
        "message_received"
    );
    Ok(())
}

/// Log which bot the token belongs to. Failures are not fatal.
async fn log_bot_identity(config: &Config, token: &str) {
    let transport = match HttpTransport::new(
        &config.api_base_url,
        token,
        Duration::from_millis(config.api_timeout_ms),
    ) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "api_transport_init_failed");
            return;
        }
    };

    match fetch_bot_user(&transport).await {
        Ok(user) => info!(bot_id = %user.id, username = %user.username, "bot_identity"),
        Err(e) => warn!(error = %e, "bot_identity_lookup_failed"),
    }
}

/// Resolve on SIGINT or SIGTERM. A signal that cannot be installed is
/// logged and never fires; the other one still stops the server.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "sigint_handler_unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    info!(signal = received, "web_server_shutting_down");
}
