//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that feeds every path to the front controller
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully
//! - Run each dispatch on the blocking pool
//!
//! # Design Decisions
//! - One catch-all route: routing belongs to the kernel, not to Axum
//! - Bodies are read fully (bounded) before dispatch; dispatch is synchronous

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::to_bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::DotEnv;
use crate::dispatch::Kernel;
use crate::http::Request;
use crate::lifecycle::signals;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub kernel: Arc<Kernel>,
    pub env: Arc<DotEnv>,
    pub max_body_size: usize,
}

/// HTTP transport for the dispatch kernel.
pub struct HttpServer {
    router: Router,
    kernel: Arc<Kernel>,
}

impl HttpServer {
    pub fn new(kernel: Arc<Kernel>, env: Arc<DotEnv>) -> Self {
        let state = AppState {
            kernel: kernel.clone(),
            env,
            max_body_size: kernel.config().listener.max_body_size,
        };
        let router = Self::build_router(kernel.config().timeouts.request_secs, state);
        Self { router, kernel }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace, id propagation, timeout.
    #[allow(deprecated)]
    fn build_router(request_secs: u64, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(front_controller))
            .route("/", any(front_controller))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(request_secs))),
            )
    }

    /// The configured router, for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Run the server until Ctrl+C, SIGTERM or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.kernel.config().app.environment,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signals::shutdown_signal() => {}
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown requested");
                    }
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request lands here and is handed to the kernel.
async fn front_controller(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_size, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = Request::from_http(parts, bytes, &state.env);
    let kernel = state.kernel.clone();
    match tokio::task::spawn_blocking(move || kernel.dispatch(request)).await {
        Ok(outcome) => outcome.response.into_http(),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
