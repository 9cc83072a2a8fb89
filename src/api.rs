//! Read-only HTTP surface over the published snapshot.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;

use crate::snapshot::SnapshotStore;

mod models;

use models::StackListResponse;

async fn list_stacks(State(store): State<Arc<SnapshotStore>>) -> Json<StackListResponse> {
    Json(StackListResponse::from_store(&store))
}

async fn get_stack(State(store): State<Arc<SnapshotStore>>, Path(name): Path<String>) -> Response {
    match store.get(&name) {
        Some(stack) => (axum::http::StatusCode::OK, Json(stack)).into_response(),
        None => (axum::http::StatusCode::NOT_FOUND, "no such stack").into_response(),
    }
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let router = axum::Router::new()
            .route("/stacks", get(list_stacks))
            .route("/stacks/{name}", get(get_stack))
            .with_state(store);
        Self { router }
    }

    /// Binds the listener and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns the bind or serve error; the caller decides whether losing
    /// the API surface is fatal.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await
    }
}
