//! HTTP backend the console polls.
//!
//! Serves the activity log and button flags as JSON and exposes the run/stop
//! triggers as plain-text GET routes.

mod hub;

pub use hub::AgentHub;

use crate::model::{ButtonStates, ServeConfig};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router(hub: Arc<AgentHub>) -> Router {
    Router::new()
        .route("/log_messages", get(log_messages))
        .route("/button_states", get(button_states))
        .route("/run_agents", get(run_agents))
        .route("/stop_agents", get(stop_agents))
        .with_state(hub)
}

async fn log_messages(State(hub): State<Arc<AgentHub>>) -> Json<Vec<String>> {
    Json(hub.log_messages())
}

async fn button_states(State(hub): State<Arc<AgentHub>>) -> Json<ButtonStates> {
    Json(hub.button_states())
}

async fn run_agents(State(hub): State<Arc<AgentHub>>) -> &'static str {
    hub.run_agents().await
}

async fn stop_agents(State(hub): State<Arc<AgentHub>>) -> &'static str {
    hub.stop_agents().await
}

/// Serve the backend until Ctrl-C, then stop any running agents.
pub async fn serve(cfg: ServeConfig) -> Result<()> {
    let hub = Arc::new(AgentHub::new(&cfg));
    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    let local = listener.local_addr().context("read bound address")?;
    tracing::info!(addr = %local, "agent backend listening");

    axum::serve(listener, router(hub.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("serve http")?;

    hub.stop_agents().await;
    Ok(())
}

/// Serve `router` on an ephemeral local port for the lifetime of the test runtime.
#[cfg(test)]
pub(crate) async fn spawn_test_server(router: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
