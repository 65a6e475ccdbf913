//! `api` crate — HTTP surfaces for every flowgrid process.
//!
//! One module per service, each exposing a `Router` builder and a `serve`
//! entry point:
//!
//!   executor      POST /fcb/add, /fcb/:id/pause, /fcb/:id/resume, GET /health
//!   runner        POST /nodes/add-node, /npu/add, /npu/pool/:id,
//!                 /npu/log/:id, /npu/result/:id, GET /npu/all
//!   trace         POST /trace, GET /trace/:runner_id, /flow/:flow_id, …
//!   secret_store  GET /get/:key, POST /set, DELETE /delete/:key, GET /keys
//!   npu_worker    GET /, POST /run-node

pub mod executor;
pub mod npu_worker;
pub mod runner;
pub mod secret_store;
pub mod trace;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// CORS + request tracing, applied uniformly to every service router.
fn with_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// Bind and serve one service router.
pub async fn serve(bind: &str, router: Router) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, with_layers(router)).await
}
