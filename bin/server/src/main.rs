use chrono::Utc;
use concierge_server::{config::ServerConfig, error::StartupError, routes, state::AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(report) = run().await {
        tracing::error!("{report}");
        std::process::exit(1);
    }
}

async fn run() -> concierge_core::Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    tracing::info!(
        grounding = config.dispatch.grounding,
        model = %config.openai.model,
        "Loaded configuration"
    );

    let state = Arc::new(AppState::from_config(&config)?);
    tracing::info!(
        tools = state.engine.registry().len(),
        handlers = ?state.handlers.names(),
        "Tool catalog ready"
    );

    // Periodic idle-session sweep
    let sweep_state = Arc::clone(&state);
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let report = sweep_state.engine.sessions().sweep(Utc::now());
            if report.expired > 0 || report.over_capacity > 0 {
                tracing::debug!(
                    expired = report.expired,
                    over_capacity = report.over_capacity,
                    remaining = report.remaining,
                    "Periodic session sweep"
                );
            }
        }
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| StartupError::Serve {
            details: format!("failed to bind to {}: {e}", config.bind_address),
        })?;

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
