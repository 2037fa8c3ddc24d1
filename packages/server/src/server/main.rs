// Main entry point for the SMS OTP relay

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use portal_client::{PortalClient, PortalOptions};
use relay_core::{
    domains::{
        dedup::SqliteDedupStore,
        feed::ChangeWatcher,
        notify::NotificationDispatcher,
        session::{Credentials, SessionController},
    },
    kernel::{
        start_scheduler, PipelineCoordinator, PipelineSettings, PortalAuthenticator,
        PortalFeedSurface, TelegramAdapter,
    },
    server::{build_app, AppState},
    Config,
};
use telegram::{TelegramOptions, TelegramService};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SMS OTP relay");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Open the dedup store
    tracing::info!("Opening dedup store...");
    let store = Arc::new(
        SqliteDedupStore::connect(&config.database_url, config.call_timeout)
            .await
            .context("Failed to open dedup store")?,
    );
    tracing::info!(
        remembered = store.count().await.unwrap_or_default(),
        "Dedup store ready"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    // Portal session
    let portal = Arc::new(
        PortalClient::new(
            PortalOptions::new(config.portal_base_url.clone()).with_timeout(config.call_timeout),
        )
        .context("Failed to build portal client")?,
    );
    let session = Arc::new(SessionController::new(
        Arc::new(PortalAuthenticator::new(portal.clone())),
        Credentials {
            email: config.portal_email.clone(),
            password: config.portal_password.clone(),
        },
        portal.feed_url().as_str(),
        config.call_timeout,
    ));
    let surface = Arc::new(PortalFeedSurface::new(
        portal.clone(),
        config.feed_poll_interval,
    ));
    let watcher = ChangeWatcher::new(surface, config.call_timeout);

    // Notification channel
    let telegram = Arc::new(
        TelegramService::new(
            TelegramOptions::new(&config.telegram_bot_token, &config.telegram_chat_id)
                .with_timeout(config.call_timeout),
        )
        .context("Failed to build Telegram client")?,
    );
    let dispatcher = NotificationDispatcher::new(
        Arc::new(TelegramAdapter::new(telegram)),
        config.call_timeout,
        shutdown.clone(),
    );

    let coordinator = Arc::new(PipelineCoordinator::new(
        store.clone(),
        dispatcher,
        session.clone(),
        PipelineSettings {
            store_timeout: config.call_timeout,
            login_retry_delay: config.login_retry_delay,
            display_offset: config.display_offset,
        },
    ));

    let pipeline = {
        let coordinator = coordinator.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { coordinator.run(watcher, shutdown).await })
    };

    let mut scheduler = start_scheduler(session.clone(), config.self_check_interval)
        .await
        .context("Failed to start scheduler")?;

    // Liveness surface
    let app = build_app(AppState {
        db_pool: store.pool().clone(),
        session,
        stats: coordinator.stats(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("Server error")?;

    // The server only returns on shutdown; wind down the rest.
    shutdown.cancel();
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
    }
    if tokio::time::timeout(Duration::from_secs(10), pipeline)
        .await
        .is_err()
    {
        tracing::warn!("Pipeline did not stop in time");
    }
    store.close().await;

    tracing::info!("Relay stopped");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = ctrl_c.await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("Received shutdown signal");
        shutdown.cancel();
    });
}
