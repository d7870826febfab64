//! HTTP/WebSocket server mirroring the repositories across clients.
//!
//! Exposes the REST surface the remote gateway pushes to, plus a WebSocket
//! channel broadcasting every change as a `data-update` event so other
//! connected clients can merge it.

mod routes;
mod state;
mod ws;

pub use state::{EventBroadcaster, ServerState};

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Router,
    http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::storage::{Storage, json::JsonFileStorage};

/// Run the sync server until the process is stopped
pub async fn run_server(port: u16, bind: &str, store_path: PathBuf) -> Result<(), String> {
    let storage = JsonFileStorage::new(store_path);
    let store = storage
        .load()
        .map_err(|e| format!("Failed to load store: {e}"))?;
    let state = ServerState::new(store, storage);

    // Permissive CORS: the browser clients may be served from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .route(
            "/api/tasks",
            get(routes::list_tasks).post(routes::create_task),
        )
        .route(
            "/api/tasks/:id",
            get(routes::get_task)
                .put(routes::update_task)
                .delete(routes::delete_task),
        )
        .route(
            "/api/specifications",
            get(routes::list_specifications).post(routes::create_specification),
        )
        .route(
            "/api/specifications/:id",
            get(routes::get_specification)
                .put(routes::update_specification)
                .delete(routes::delete_specification),
        )
        .route("/api/assign-task", axum::routing::post(routes::assign_task))
        .route(
            "/api/unassign-task",
            axum::routing::post(routes::unassign_task),
        )
        .route("/api/users", get(routes::list_users))
        .route("/api/users/online", get(routes::list_online_users))
        .route("/ws/events", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .map_err(|e| format!("Invalid address: {e}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

    println!("Silex sync server listening on http://{addr}");
    println!("  REST     http://{addr}/api/tasks");
    println!("  Events   ws://{addr}/ws/events");
    log::info!("Server listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {e}"))
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}
