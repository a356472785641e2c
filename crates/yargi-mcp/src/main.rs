//! HTTP entry point.
//!
//! Serves the MCP protocol at `/mcp` (streamable HTTP) and `/sse` (legacy),
//! plus three unauthenticated routes: `/` service metadata, `/health` and
//! `/status`. Configuration is environment-only: `HOST`, `PORT`,
//! `LOG_LEVEL`, `ALLOWED_ORIGINS`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use yargi_mcp::YargiMcpServer;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn cors_layer() -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-request-id"),
        ]);
    let origins = env_or("ALLOWED_ORIGINS", "*");
    if origins.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let values: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.parse().with_context(|| format!("bad origin `{o}`")))
        .collect::<anyhow::Result<_>>()?;
    Ok(layer.allow_origin(values))
}

async fn root(State(server): State<Arc<YargiMcpServer>>) -> Json<Value> {
    Json(json!({
        "service": "Yargı MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": server.tool_names().len(),
        "endpoints": {
            "mcp": "/mcp",
            "sse": "/sse",
            "health": "/health",
            "status": "/status",
        },
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Yargı MCP Server",
    }))
}

async fn status(State(server): State<Arc<YargiMcpServer>>) -> Json<Value> {
    let tools = server.tool_names();
    Json(json!({
        "tool_count": tools.len(),
        "tools": tools,
    }))
}

async fn shutdown_signal(ct: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
    ct.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(env_or("LOG_LEVEL", "info"))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let host = env_or("HOST", "127.0.0.1");
    let port = env_or("PORT", "8000");
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid HOST/PORT `{host}:{port}`"))?;

    let server = YargiMcpServer::new().context("failed to build adapter clients")?;
    let shared = Arc::new(server.clone());

    let streamable_service = StreamableHttpService::new(
        {
            let server = server.clone();
            move || Ok(server.clone())
        },
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let ct = CancellationToken::new();
    let (sse_server, sse_router) = SseServer::new(SseServerConfig {
        bind: addr,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: ct.child_token(),
        sse_keep_alive: None,
    });
    let _sse_ct = {
        let server = server.clone();
        sse_server.with_service(move || server.clone())
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(Arc::clone(&shared))
        .nest_service("/mcp", streamable_service)
        .merge(sse_router)
        .layer(cors_layer()?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, tools = shared.tool_names().len(), "yargi-mcp serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ct.clone()))
        .await
        .context("server error")?;

    shared.close_all().await;
    info!("yargi-mcp stopped");
    Ok(())
}
