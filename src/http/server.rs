//! # HTTP Server
//!
//! Serves every configured grid view over one axum router.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::grid::view::GridView;
use crate::store::GridStore;

use super::actor::{ActorResolver, HeaderActorResolver};
use super::routes::{grid_routes, health_routes, GridState};

/// HTTP server for a set of grid views over one store
pub struct GridServer<S: GridStore + 'static> {
    config: ServerConfig,
    state: Arc<GridState<S>>,
}

impl<S: GridStore + 'static> GridServer<S> {
    /// Create a server resolving actors from request headers
    pub fn new(config: ServerConfig, store: Arc<S>, views: HashMap<String, Arc<GridView>>) -> Self {
        Self::with_actor_resolver(config, store, views, Arc::new(HeaderActorResolver))
    }

    pub fn with_actor_resolver(
        config: ServerConfig,
        store: Arc<S>,
        views: HashMap<String, Arc<GridView>>,
        actors: Arc<dyn ActorResolver>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(GridState { store, views, actors }),
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    fn cors_layer(&self) -> CorsLayer {
        if self.config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Build the router (also used by tests)
    pub fn router(&self) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        });

        Router::new()
            .merge(health_routes(self.state.views.len()))
            .merge(grid_routes(self.state.clone()))
            .layer(self.cors_layer())
            .layer(trace)
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let mut resources: Vec<_> = self.state.views.keys().cloned().collect();
        resources.sort();
        info!(%addr, views = ?resources, "starting tablegrid HTTP server");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_health() {
        let server = GridServer::new(ServerConfig::default(), Arc::new(MemoryStore::new()), HashMap::new());
        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["views"], 0);
    }

    #[test]
    fn test_socket_addr() {
        let server = GridServer::new(ServerConfig::with_port(9100), Arc::new(MemoryStore::new()), HashMap::new());
        assert_eq!(server.socket_addr(), "0.0.0.0:9100");
    }
}
