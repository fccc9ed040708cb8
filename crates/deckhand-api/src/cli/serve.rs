//! `deckhand serve`: run the webhook receiver.

use std::sync::Arc;

use anyhow::{Context, Result};

use deckhand_core::orchestrator::Orchestrator;
use deckhand_core::orchestrator::memory::InMemoryOrchestrator;
use deckhand_core::registry::ServiceRegistry;
use deckhand_infra::config::{ConfigOverrides, load_config};
use deckhand_infra::docker::DockerOrchestrator;
use deckhand_types::config::DeckhandConfig;

use crate::http::router::build_router;
use crate::state::AppState;

/// Load configuration, connect the orchestrator and serve until shutdown.
pub async fn serve(overrides: &ConfigOverrides, dry_run: bool) -> Result<()> {
    let config = load_config(overrides)
        .await
        .context("failed to load configuration")?;

    let registry = Arc::new(ServiceRegistry::new(&config.services));
    log_registry(&registry);

    if dry_run {
        tracing::warn!("dry run: updates are applied to an in-memory orchestrator");
        return run_server(&config, registry, InMemoryOrchestrator::auto_create()).await;
    }

    let orchestrator = DockerOrchestrator::new(&config.docker, config.registry_auth.as_ref())
        .with_context(|| format!("invalid docker host '{}'", config.docker.host))?;

    match orchestrator.info().await {
        Ok(info) => {
            tracing::info!(
                server_version = ?info.server_version,
                swarm_state = ?info.swarm.as_ref().and_then(|s| s.local_node_state.as_deref()),
                "connected to docker daemon running on {}",
                info.name
            );
            if info.swarm.as_ref().is_some_and(|s| !s.control_available) {
                tracing::warn!("docker node is not a swarm manager; service updates will fail");
            }
        }
        Err(error) => {
            tracing::warn!(%error, host = %config.docker.host, "docker daemon probe failed");
        }
    }

    run_server(&config, registry, orchestrator).await
}

fn log_registry(registry: &ServiceRegistry) {
    if registry.is_empty() {
        tracing::warn!("no services configured; every publish will be answered with NO_SERVICE_FOUND_FOR_PACKAGE_URL");
        return;
    }
    for (service_id, image) in registry.iter() {
        tracing::info!(%service_id, %image, "tracking service");
    }
}

async fn run_server<O>(
    config: &DeckhandConfig,
    registry: Arc<ServiceRegistry>,
    orchestrator: O,
) -> Result<()>
where
    O: Orchestrator + 'static,
{
    let state = AppState::new(config, registry, orchestrator);
    let router = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "ready to receive webhooks on port {}", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "shutting down"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "shutting down"),
    }
}
