//! Room Agent Backend
//!
//! REST server for managing headless-browser agents that join
//! video-conference rooms, with a pass-through proxy to the conferencing
//! backend and a host snapshot endpoint.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use room_agent_backend::agent::Agent;
use room_agent_backend::api::{self, AppCtx};
use room_agent_backend::config::Config;
use room_agent_backend::services::license;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    status: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let ctx = AppCtx::new(config);

    // License gate: only enforced when a key is configured.
    match &ctx.config.license.key {
        Some(key) => {
            let accepted =
                license::verify(&ctx.http, &ctx.config.license.api_url, key).await?;
            if !accepted {
                anyhow::bail!("license key rejected, refusing to start");
            }
            info!("License key accepted");
        }
        None => warn!("No LICENSE_KEY configured, skipping license check"),
    }

    // Rebuild the registry from the snapshot (idle agents only).
    let loaded = ctx.state.write().await.load();
    info!(loaded, "Agent registry initialized");

    // Startup smoke test of the automation stack; diagnostic, not fatal.
    {
        let automation = ctx.config.automation.clone();
        tokio::spawn(async move {
            if Agent::cold_start(&automation).await {
                info!("Cold start health check passed");
            } else {
                warn!("Cold start health check failed, agents may not launch");
            }
        });
    }

    let app = Router::new()
        .route("/", get(hello))
        .route("/api/health", get(health_check))
        // Agent registry
        .route("/agents.list", get(api::agents::list_agents))
        .route("/agents.status", get(api::agents::agents_status))
        .route("/agent/create", post(api::agents::create_agent))
        .route(
            "/agent/:id",
            get(api::agents::get_agent).delete(api::agents::delete_agent),
        )
        .route("/agent/:id/status", get(api::agents::get_agent_status))
        .route("/agent/:id/config", get(api::agents::get_agent_config))
        .route(
            "/agent/:id/screenshot",
            get(api::agents::get_agent_screenshot),
        )
        .route("/agent/:id/start", post(api::agents::start_agent))
        .route("/agent/:id/stop", post(api::agents::stop_agent))
        .route("/agent/:id/exec", post(api::agents::exec_agent))
        // Host snapshot
        .route("/machine", get(api::machine::machine_info))
        // Conferencing backend proxy
        .route("/conference/login", post(api::conference::login))
        .route("/conference/me", get(api::conference::me))
        .route(
            "/conference/capabilities",
            get(api::conference::capabilities),
        )
        .route("/conference/call.create", post(api::conference::call_create))
        .route("/conference/call.info/:id", get(api::conference::call_info))
        .route("/conference/call.join", post(api::conference::call_join))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx.clone());

    let addr: SocketAddr = ctx
        .config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Tear down any sessions still live so no browser outlives the server.
    let state = ctx.state.read().await;
    for (_, handle) in state.agents_list() {
        handle.agent.lock().await.stop().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Room Agent Backend".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
