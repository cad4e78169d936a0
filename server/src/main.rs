//! Task list server
//!
//! Serves the task page and REST API on the HTTP port and pushes list
//! updates over Socket.IO on the socket port.

mod config;
mod routes;
mod socket;
mod state;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasklist_core::store::{DocumentStore, LocalDocumentStore};

use crate::config::ServerConfig;
use crate::socket::{create_socket_layer, spawn_sync_forwarder, SocketState};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tasklist_server=debug,tasklist_core=debug,tower_http=debug,socketioxide=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Using configuration: {:?}", config);

    let store: Arc<dyn DocumentStore> = if config.persist {
        Arc::new(
            LocalDocumentStore::open(config.store_path())
                .await
                .expect("Failed to open document store"),
        )
    } else {
        Arc::new(LocalDocumentStore::in_memory())
    };

    let app_state = AppState::new(store, config.collection.clone(), config.socket_port);

    // The watch is the first thing established and the last thing released
    app_state
        .synchronizer()
        .subscribe()
        .await
        .expect("Failed to subscribe to task collection");

    // Create Socket.IO layer
    let socket_state = SocketState {
        app: app_state.clone(),
    };
    let (socket_layer, io) = create_socket_layer(socket_state);
    let forwarder = spawn_sync_forwarder(io, app_state.tasks());

    // REST API and page server
    let rest_app = Router::new()
        .merge(routes::health::router())
        .merge(routes::page::router())
        .merge(routes::task::router())
        .with_state(app_state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Layers are applied bottom-to-top, so CorsLayer is added last to be applied first
    let socket_app = Router::new()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(socket_layer);

    let rest_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let socket_addr = SocketAddr::from(([0, 0, 0, 0], config.socket_port));

    tracing::info!("HTTP listening on {}", rest_addr);
    tracing::info!("Socket.IO listening on {}", socket_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let rest_listener = tokio::net::TcpListener::bind(rest_addr).await.unwrap();
    let mut rest_shutdown = shutdown_rx.clone();
    let rest_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(rest_listener, rest_app)
            .with_graceful_shutdown(async move {
                let _ = rest_shutdown.changed().await;
            })
            .await
        {
            tracing::error!("HTTP server failed: {}", e);
        }
    });

    let socket_listener = tokio::net::TcpListener::bind(socket_addr).await.unwrap();
    let mut socket_shutdown = shutdown_rx;
    let socket_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(socket_listener, socket_app)
            .with_graceful_shutdown(async move {
                let _ = socket_shutdown.changed().await;
            })
            .await
        {
            tracing::error!("Socket.IO server failed: {}", e);
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);

    release(&app_state, vec![rest_handle, socket_handle], forwarder).await;
}

/// Wait for the servers, then release the watch whatever they returned
async fn release(app_state: &AppState, servers: Vec<JoinHandle<()>>, forwarder: JoinHandle<()>) {
    for result in futures::future::join_all(servers).await {
        if let Err(e) = result {
            tracing::error!("Server task failed: {}", e);
        }
    }

    app_state.synchronizer().unsubscribe().await;
    let _ = forwarder.await;
}
