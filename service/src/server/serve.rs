//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DeployError;
use crate::server::handlers::{
    delete_handler, deploy_handler, health_handler, info_handler, invalidate_handler,
    list_handler, version_handler,
};
use crate::server::state::ServerState;

/// A running server: the address it bound and its task
pub struct ServeHandle {
    pub addr: SocketAddr,
    pub task: JoinHandle<Result<(), DeployError>>,
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<ServeHandle, DeployError> {
    let app = Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployments
        .route("/deployments", get(list_handler))
        .route("/deployments/{page_id}", get(info_handler).delete(delete_handler))
        .route("/deployments/{page_id}/deploy", post(deploy_handler))
        .route("/deployments/{page_id}/invalidate", post(invalidate_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::ServerError(e.to_string()))?;
    let addr = listener
        .local_addr()
        .map_err(|e| DeployError::ServerError(e.to_string()))?;

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::ServerError(e.to_string()))
    });

    Ok(ServeHandle { addr, task })
}
