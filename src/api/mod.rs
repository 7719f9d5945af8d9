mod handlers;
pub mod validation;

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::contracts::{Metric, MetricsStore};

pub use handlers::{ApiError, AppState, ErrorResponse, Metrics, StatsResponse};

/// Creates the API router.
///
/// Each metric gets its own `/rank-{metric}` and
/// `/user-rank-{metric}/:user_github` route, all served by the same two
/// handlers.
pub fn create_router<S: MetricsStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::list_metrics::<S>))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats::<S>))
        .route("/metrics", post(handlers::submit_metrics::<S>))
        .route("/metrics/ranking", get(handlers::combined_ranking::<S>));

    for metric in Metric::ALL {
        router = router
            .route(
                &format!("/rank-{}", metric.slug()),
                get(move |State(state): State<Arc<AppState<S>>>| {
                    handlers::rank_by_metric(state, metric)
                }),
            )
            .route(
                &format!("/user-rank-{}/:user_github", metric.slug()),
                get(
                    move |State(state): State<Arc<AppState<S>>>,
                          Path(user_github): Path<String>| {
                        handlers::user_rank(state, metric, user_github)
                    },
                ),
            );
    }

    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    router
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Turns a handler panic into a 500 carrying the panic message.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(panic = %message, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message,
            code: "INTERNAL".into(),
        }),
    )
        .into_response()
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Creates a config from environment variables.
    ///
    /// Reads:
    /// - `INPUTRANK_HOST`: Bind address (default: 0.0.0.0)
    /// - `INPUTRANK_PORT`, then `PORT`: Listen port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let host = lookup("INPUTRANK_HOST").unwrap_or(default.host);
        let port = lookup("INPUTRANK_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(default.port);

        Self { host, port }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Starts the HTTP server.
pub async fn start_server<S, F>(
    config: ServerConfig,
    state: Arc<AppState<S>>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: MetricsStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = config.bind_address();

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
