//! Task list page
//!
//! Server-rendered form with one checkbox and delete button per task. A
//! Socket.IO listener re-renders the list when the server pushes a new
//! projection.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::warn;

use tasklist_core::task::{Task, TitleDraft};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTaskForm {
    /// Completion state shown when the checkbox was clicked
    pub completed: bool,
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_task(task: &Task) -> String {
    let id = escape_html(&task.id);
    format!(
        r#"<li data-id="{id}">
  <form method="post" action="/tasks/{id}/toggle" class="toggle">
    <input type="hidden" name="completed" value="{completed}">
    <input type="checkbox" onchange="this.form.submit()"{checked}>
    <span class="{class}">{title}</span>
  </form>
  <form method="post" action="/tasks/{id}/delete" class="delete">
    <button type="submit">Delete</button>
  </form>
</li>"#,
        completed = task.completed,
        checked = if task.completed { " checked" } else { "" },
        class = if task.completed { "done" } else { "" },
        title = escape_html(&task.title),
    )
}

/// Render the full page with `draft` staged in the text input
pub fn render_page(tasks: &[Task], draft: &str, socket_port: u16) -> String {
    let items: String = tasks.iter().map(render_task).collect::<Vec<_>>().join("\n");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Tasks</title>
<style>
  body {{ font-family: sans-serif; max-width: 28rem; margin: 2rem auto; }}
  li {{ display: flex; justify-content: space-between; padding: .25rem 0; }}
  form {{ display: inline; }}
  .done {{ text-decoration: line-through; }}
</style>
</head>
<body>
<h1>Tasks</h1>
<form method="post" action="/tasks" id="new-task">
  <input type="text" name="title" placeholder="New task" value="{draft}">
  <button type="submit">Add task</button>
</form>
<ul id="tasks">
{items}
</ul>
<script src="https://cdn.socket.io/4.7.5/socket.io.min.js"></script>
<script>
  const list = document.getElementById("tasks");
  function row(task) {{
    const li = document.createElement("li");
    li.dataset.id = task.id;
    const id = encodeURIComponent(task.id);
    li.innerHTML =
      `<form method="post" action="/tasks/${{id}}/toggle" class="toggle">` +
      `<input type="hidden" name="completed" value="${{task.completed}}">` +
      `<input type="checkbox" onchange="this.form.submit()"${{task.completed ? " checked" : ""}}>` +
      `<span class="${{task.completed ? "done" : ""}}"></span></form>` +
      `<form method="post" action="/tasks/${{id}}/delete" class="delete">` +
      `<button type="submit">Delete</button></form>`;
    li.querySelector("span").textContent = task.title;
    return li;
  }}
  const socket = io(`${{location.protocol}}//${{location.hostname}}:{socket_port}`, {{ transports: ["websocket"] }});
  socket.on("tasks:sync", (tasks) => list.replaceChildren(...tasks.map(row)));
</script>
</body>
</html>
"#,
        draft = escape_html(draft),
    )
}

/// GET / - Task list page
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.tasks().tasks(), "", state.socket_port()))
}

/// POST /tasks - Submit the staged title
async fn add_task(State(state): State<AppState>, Form(form): Form<AddTaskForm>) -> Response {
    let mut draft = TitleDraft::from(form.title);

    match state.synchronizer().submit(&mut draft).await {
        Ok(Some(_)) => return Redirect::to("/").into_response(),
        Ok(None) => {}
        Err(e) => warn!("Failed to add task: {}", e),
    }

    // Draft stays in the input; the list is whatever the last snapshot said
    Html(render_page(&state.tasks().tasks(), draft.as_str(), state.socket_port())).into_response()
}

/// POST /tasks/:id/toggle
async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ToggleTaskForm>,
) -> Redirect {
    if let Err(e) = state.synchronizer().toggle_task(&id, form.completed).await {
        warn!("Failed to toggle task {}: {}", id, e);
    }
    Redirect::to("/")
}

/// POST /tasks/:id/delete
async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    if let Err(e) = state.synchronizer().delete_task(&id).await {
        warn!("Failed to delete task {}: {}", id, e);
    }
    Redirect::to("/")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/tasks", post(add_task))
        .route("/tasks/{id}/toggle", post(toggle_task))
        .route("/tasks/{id}/delete", post(delete_task))
}
