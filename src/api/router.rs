//! API router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{
    clear_session, delete_session, delete_value, get_session, get_value, health, put_value,
    visits, AppState,
};
use crate::error::SessionError;
use crate::manager::SessionManager;

/// Create the demo router around `manager`.
pub fn create_router(manager: SessionManager) -> Router {
    create_router_with_state(AppState::new(manager))
}

/// Create the demo router with custom state.
///
/// Every route runs inside the session middleware of `state.sessions`.
pub fn create_router_with_state(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/", get(get_session).delete(delete_session))
        .route("/clear", post(clear_session))
        .route("/{key}", get(get_value).put(put_value).delete(delete_value));

    let router = Router::new()
        .route("/health", get(health))
        .route("/visits", get(visits))
        .nest("/session", session_routes)
        .with_state(state.clone());

    state
        .sessions
        .attach(router)
        .layer(TraceLayer::new_for_http())
}

/// Start the demo server on `addr`.
pub async fn serve(addr: &str, manager: SessionManager) -> crate::Result<()> {
    let router = create_router(manager);

    tracing::info!("Starting session-keeper demo server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(SessionError::Server)?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(SessionError::Server)?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
