//! Grid and health HTTP routes
//!
//! - `POST /grid/:resource`: JSON page; form-encoded body, AJAX only
//! - `GET /grid/:resource?download`: CSV export
//! - `GET /health`

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::grid::access::AccessMode;
use crate::grid::errors::{GridError, GridResult};
use crate::grid::render::GridResponse;
use crate::grid::view::GridView;
use crate::store::GridStore;

use super::actor::ActorResolver;

/// Query parameter that turns a GET into an export
pub const DOWNLOAD_PARAM: &str = "download";

/// Shared state of the grid routes
pub struct GridState<S: GridStore> {
    pub store: Arc<S>,
    pub views: HashMap<String, Arc<GridView>>,
    pub actors: Arc<dyn ActorResolver>,
}

impl<S: GridStore> GridState<S> {
    fn view(&self, resource: &str) -> GridResult<&GridView> {
        self.views
            .get(resource)
            .map(Arc::as_ref)
            .ok_or_else(|| GridError::ViewNotFound(resource.to_string()))
    }

    fn run(
        &self,
        resource: &str,
        headers: &HeaderMap,
        params: &HashMap<String, String>,
        mode: AccessMode,
    ) -> GridResult<GridResponse> {
        let view = self.view(resource)?;
        let actor = self.actors.resolve(headers);
        view.handle(self.store.as_ref(), params, actor.as_ref(), mode)
    }
}

type SharedState<S> = Arc<GridState<S>>;

/// Create grid routes
pub fn grid_routes<S: GridStore + 'static>(state: SharedState<S>) -> Router {
    Router::new()
        .route("/grid/:resource", get(export_handler::<S>).post(page_handler::<S>))
        .with_state(state)
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

/// JSON page handler
async fn page_handler<S: GridStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Result<GridResponse, GridError> {
    state.view(&resource)?;
    if !is_ajax(&headers) {
        return Err(GridError::NotAjax);
    }
    state.run(&resource, &headers, &params, AccessMode::View)
}

/// CSV export handler
async fn export_handler<S: GridStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<GridResponse, GridError> {
    state.view(&resource)?;
    if !params.contains_key(DOWNLOAD_PARAM) {
        return Err(GridError::DownloadRequired);
    }
    state.run(&resource, &headers, &params, AccessMode::Download)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub views: usize,
}

/// Health check route
pub fn health_routes(views: usize) -> Router {
    Router::new().route(
        "/health",
        get(move || async move { health_handler(views) }),
    )
}

fn health_handler(views: usize) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        views,
    };

    (StatusCode::OK, Json(response))
}
