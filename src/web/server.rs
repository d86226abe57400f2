//! HTTP server implementation for the task board.
//!
//! This module provides the axum-based HTTP server that renders the board,
//! accepts task forms and serves static assets and uploaded covers.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::form::{TaskForm, parse_task_id};
use super::templates::{self, IndexPage, Templates};
use super::ws::ws_handler;
use crate::error::{AppError, AppResult};
use crate::service::TaskService;
use crate::terminal;

/// Page title of the board.
pub const PAGE_TITLE: &str = "Home Task";

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    service: TaskService,
    templates: Arc<Templates>,
    /// Directory served at `/static/uploads`.
    uploads_root: PathBuf,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: TaskService, templates: Templates, uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            service,
            templates: Arc::new(templates),
            uploads_root: uploads_root.into(),
            max_upload_bytes: 10 << 20,
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Run blocking service work off the async executor.
async fn blocking<F, T>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(AppError::internal)?
}

/// Root endpoint - renders the task list.
async fn list_tasks(State(state): State<AppState>) -> AppResult<Html<String>> {
    let service = state.service.clone();
    let (tasks, counts) = blocking(move || {
        let tasks = service.get_all_tasks()?;
        let counts = service.db().status_counts()?;
        Ok((tasks, counts))
    })
    .await?;

    let terminals = terminal::available_terminals();
    let html = state.templates.render_index(&IndexPage {
        title: PAGE_TITLE,
        os: terminal::current_os(),
        tasks: &tasks,
        status_counts: &counts,
        terminals: &terminals,
    });
    Ok(Html(html))
}

/// Handle the add form.
async fn add_task(State(state): State<AppState>, multipart: Multipart) -> AppResult<Redirect> {
    let form = TaskForm::from_multipart(multipart).await?;
    let input = form.new_task();
    let cover = form.cover;

    let service = state.service.clone();
    blocking(move || service.create_task(input, cover)).await?;

    Ok(Redirect::to("/"))
}

/// Handle the edit form. The id is validated before the body is read.
async fn update_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let id = parse_task_id(&raw_id)?;
    let form = TaskForm::from_multipart(multipart).await?;
    let patch = form.patch();
    let cover = form.cover;

    let service = state.service.clone();
    blocking(move || service.update_task(id, patch, cover)).await?;

    Ok(Redirect::to("/"))
}

/// Handle task deletion.
async fn delete_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Redirect> {
    let id = parse_task_id(&raw_id)?;

    let service = state.service.clone();
    blocking(move || service.delete_task(id)).await?;

    Ok(Redirect::to("/"))
}

/// Embedded stylesheet and script.
async fn static_asset(Path(name): Path<String>) -> Response {
    match templates::asset(&name) {
        Some((body, content_type)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.uploads_root);
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Page routes
        .route("/", get(list_tasks))
        .route("/task/add", post(add_task))
        .route("/task/update/{id}", post(update_task))
        .route("/task/delete/{id}", post(delete_task))
        // Terminal side channel
        .route("/ws", get(ws_handler))
        // Static files
        .route("/static/assets/{name}", get(static_asset))
        .nest_service("/static/uploads", uploads)
        // API routes
        .route("/api/health", get(health))
        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `addr`.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: AppState,
    addr: &str,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr, tokio::task::JoinHandle<()>)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task board listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task board shutting down");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr, handle))
}
