use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use granary_api::config::ServerConfig;
use granary_api::router::build_app_router;
use granary_api::state::AppState;
use granary_engine::Monitor;
use granary_events::{
    EmailConfig, EmailDelivery, EmailNotifier, EventBus, NotificationRouter, Notifier,
    WebhookNotifier,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "granary_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));

    // --- Monitoring engine ---
    let monitor = Arc::new(Monitor::new(Arc::clone(&event_bus)));
    tracing::info!("Monitoring engine created");

    // --- Notification router ---
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(url) = &config.webhook_url {
        tracing::info!(url = %url, "Webhook notifications enabled");
        notifiers.push(Arc::new(WebhookNotifier::new(url.clone())));
    }
    match (EmailConfig::from_env(), &config.alert_email_to) {
        (Some(email_config), Some(to)) => {
            tracing::info!(to = %to, "Email notifications enabled");
            notifiers.push(Arc::new(EmailNotifier::new(
                EmailDelivery::new(email_config),
                to.clone(),
            )));
        }
        _ => tracing::info!("Email notifications not configured"),
    }

    let notify_cancel = tokio_util::sync::CancellationToken::new();
    let notify_handle = tokio::spawn(
        NotificationRouter::new(notifiers).run(event_bus.subscribe(), notify_cancel.clone()),
    );
    tracing::info!("Notification router started");

    // --- App state ---
    let state = AppState {
        monitor,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the notification router, then drop the bus sender to close the
    // broadcast channel for any remaining subscribers.
    notify_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), notify_handle).await;
    drop(event_bus);
    tracing::info!("Notification router stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
