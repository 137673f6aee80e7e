use crate::config::Config;
use crate::notifications::HomeAssistantClient;
use crate::supervisor::SupervisorStatus;
use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod routes_status;

pub use routes_status::liveness_report;

const NO_CACHE: &str = "no-store, must-revalidate";

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Name of the camera being streamed
    pub camera: String,
    /// Supervisor status feed, absent when only serving files
    pub status: Option<watch::Receiver<SupervisorStatus>>,
    pub ha: Arc<HomeAssistantClient>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD]);

    let public = ServeDir::new(&ctx.config.server.output_dir);

    Router::new()
        .merge(routes_status::status_routes())
        .nest_service("/public", public)
        .layer(middleware::from_fn(hls_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// HLS content types, keyed on the request path's extension.
fn hls_content_type(path: &str) -> Option<&'static str> {
    if path.ends_with(".m3u8") {
        Some("application/vnd.apple.mpegurl")
    } else if path.ends_with(".ts") {
        Some("video/mp2t")
    } else {
        None
    }
}

/// Players must never see a cached manifest or segment.
async fn hls_headers(req: Request, next: Next) -> Response {
    let content_type = hls_content_type(req.uri().path());
    let mut response = next.run(req).await;

    if let Some(content_type) = content_type {
        if response.status().is_success() {
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        }
    }
    response
}

/// Bind the configured address and serve until `cancel` fires.
pub async fn start_server(ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    serve(listener, ctx, cancel).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
