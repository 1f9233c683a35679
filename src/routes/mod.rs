//! Route modules for the file server

pub mod api;
pub mod files;
pub mod health;
pub mod pages;
pub mod upload;

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let max_upload_size = state.config().upload.max_size;
    let static_dir = state.config().web.static_dir.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api::router())
        .merge(upload::router(max_upload_size))
        .nest("/download", files::router())
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(pages::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Per-request span; the response event inside it adds status and latency
fn request_span(request: &Request<Body>) -> Span {
    let client_ip = client_ip(request)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "request",
        client_ip = %client_ip,
        method = %request.method(),
        path = %request.uri().path(),
        query = request.uri().query().unwrap_or(""),
    )
}

/// Peer address, present when served with connect info
fn client_ip(request: &Request<Body>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
