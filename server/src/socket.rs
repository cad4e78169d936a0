//! Socket.IO push channel
//!
//! Every connected browser gets the current task list on connect and again
//! whenever a new snapshot has been applied. Clients can also send the
//! three task intents over the socket.

use serde::Deserialize;
use socketioxide::extract::{Data, SocketRef, State};
use socketioxide::{SocketIo, TransportType};
use tracing::{debug, info, warn};

use tasklist_core::sync::TaskListReader;
use tasklist_core::task::Task;

use crate::state::AppState;

const SYNC_EVENT: &str = "tasks:sync";

/// Shared state for Socket.IO handlers
#[derive(Clone)]
pub struct SocketState {
    pub app: AppState,
}

// ============ Event Payloads ============

#[derive(Debug, Deserialize)]
pub struct AddTaskPayload {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTaskPayload {
    pub id: String,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTaskPayload {
    pub id: String,
}

// ============ Event Handlers ============

/// Handle new socket connection
pub async fn on_connect(socket: SocketRef, State(state): State<SocketState>) {
    info!("Client connected: {}", socket.id);

    if let Err(e) = socket.emit(SYNC_EVENT, &state.app.tasks().tasks()) {
        warn!("Failed to emit initial sync: {}", e);
    }

    socket.on(
        "tasks:add",
        |socket: SocketRef, State(state): State<SocketState>, Data(data): Data<AddTaskPayload>| async move {
            debug!("Client {} adding task", socket.id);
            handle_add_task(&state, data).await;
        },
    );

    socket.on(
        "tasks:toggle",
        |State(state): State<SocketState>, Data(data): Data<ToggleTaskPayload>| async move {
            handle_toggle_task(&state, data).await;
        },
    );

    socket.on(
        "tasks:delete",
        |State(state): State<SocketState>, Data(data): Data<DeleteTaskPayload>| async move {
            handle_delete_task(&state, data).await;
        },
    );

    socket.on_disconnect(|socket: SocketRef| async move {
        info!("Client disconnected: {}", socket.id);
    });
}

// Failures stay in the server log; clients only ever see the next sync.

async fn handle_add_task(state: &SocketState, data: AddTaskPayload) {
    if let Err(e) = state.app.synchronizer().add_task(&data.title).await {
        warn!("Failed to add task: {}", e);
    }
}

async fn handle_toggle_task(state: &SocketState, data: ToggleTaskPayload) {
    if let Err(e) = state
        .app
        .synchronizer()
        .toggle_task(&data.id, data.completed)
        .await
    {
        warn!("Failed to toggle task {}: {}", data.id, e);
    }
}

async fn handle_delete_task(state: &SocketState, data: DeleteTaskPayload) {
    if let Err(e) = state.app.synchronizer().delete_task(&data.id).await {
        warn!("Failed to delete task {}: {}", data.id, e);
    }
}

/// Call `emit` with the task list after every applied snapshot
///
/// Returns once the synchronizer releases its watch.
async fn forward_changes(mut tasks: TaskListReader, mut emit: impl FnMut(&[Task])) {
    while tasks.changed().await.is_ok() {
        let list = tasks.tasks();
        debug!("Broadcasting {} tasks", list.len());
        emit(&list);
    }
    debug!("Task list closed, stopping broadcasts");
}

/// Broadcast the task list to all clients after every applied snapshot
pub fn spawn_sync_forwarder(io: SocketIo, tasks: TaskListReader) -> tokio::task::JoinHandle<()> {
    tokio::spawn(forward_changes(tasks, move |list| {
        if let Err(e) = io.emit(SYNC_EVENT, list) {
            warn!("Failed to broadcast sync: {}", e);
        }
    }))
}

/// Create and configure Socket.IO layer
pub fn create_socket_layer(state: SocketState) -> (socketioxide::layer::SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::builder()
        .with_state(state)
        // Only allow WebSocket transport to avoid CORS issues with polling
        .transports([TransportType::Websocket])
        .build_layer();

    io.ns("/", on_connect);

    (layer, io)
}
