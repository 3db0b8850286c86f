use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use nexus_config::ServerConfig;
use nexus_core::{AgentRegistry, Invoker};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::handlers;

/// Shared by every request: the two stores plus the invocation router.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub invoker: Invoker,
}

impl AppState {
    pub fn new(registry: Arc<AgentRegistry>, invoker: Invoker) -> Self {
        Self { registry, invoker }
    }
}

/// Any origin may call the API. `OPTIONS` requests are answered by the layer
/// without reaching a handler.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route(
            "/agents",
            get(handlers::list_agents)
                .post(handlers::register_agent)
                .fallback(handlers::not_found),
        )
        .route(
            "/agents/{id}",
            delete(handlers::remove_agent).fallback(handlers::not_found),
        )
        .route(
            "/agents/{id}/run",
            post(handlers::run_agent).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(cors())
        .with_state(state)
}

pub struct AgentServer {
    config: ServerConfig,
    state: AppState,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AgentServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            shutdown_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Bind the listener and serve in the background. Returns the bound
    /// address, which differs from the configured one when port is 0.
    pub async fn start(&self) -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .with_context(|| {
                format!(
                    "failed to bind {}:{}",
                    self.config.host, self.config.port
                )
            })?;
        let addr = listener.local_addr()?;
        info!("Agent server listening on http://{addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        *self.shutdown_tx.lock().await = Some(shutdown_tx);

        let app = router(self.state.clone());
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = server.await {
                error!("Agent server error: {e}");
            }
        });
        *self.task.lock().await = Some(task);

        Ok(addr)
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn stop(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.lock().await.take() {
            task.await.context("agent server task failed")?;
        }
        Ok(())
    }
}
