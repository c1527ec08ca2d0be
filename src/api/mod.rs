//! HTTP API for the shopping assistant.
//!
//! ```text
//! /health                         liveness + version
//! /api/status                     capability health report
//! /api/search                     one capability
//! /api/search/all                 every serving capability
//! /api/price-comparison           price summary across capabilities
//! /api/lists[/{session}[/...]]    per-session shopping lists
//! /metrics                        Prometheus exposition
//! ```

mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::metrics::MetricsService;
use crate::service::ServiceManager;
use crate::shopping_list::ShoppingLists;

pub use routes::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ServiceManager>,
    pub lists: Arc<ShoppingLists>,
    pub metrics: Arc<MetricsService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(manager: Arc<ServiceManager>, metrics: MetricsService) -> Self {
        Self {
            manager,
            lists: Arc::new(ShoppingLists::new()),
            metrics: Arc::new(metrics),
            start_time: Instant::now(),
        }
    }
}

/// HTTP API server.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn with_state(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Router with CORS and tracing applied.
    pub fn router(&self) -> Router {
        let router: Router = Router::new()
            .route("/health", get(routes::health))
            .route("/api/status", get(routes::status))
            .route("/api/search", post(routes::search))
            .route("/api/search/all", get(routes::search_all))
            .route("/api/price-comparison", get(routes::price_comparison))
            .route("/api/lists", post(routes::create_list))
            .route(
                "/api/lists/{session}",
                get(routes::list_items).delete(routes::delete_list),
            )
            .route("/api/lists/{session}/items", post(routes::add_item))
            .route(
                "/api/lists/{session}/items/{index}",
                delete(routes::remove_item),
            )
            .route("/api/lists/{session}/export", get(routes::export_list))
            .route("/metrics", get(routes::metrics))
            .with_state(self.state.clone());

        let cors = self
            .config
            .cors_enabled
            .then(|| cors_layer(&self.config.cors_origins));
        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .option_layer(cors),
        )
    }

    /// Bind `addr` and serve until the task is dropped.
    pub async fn run(self, addr: &str) -> Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
