//! Souq server library.
//!
//! This crate provides the server as a library so the router can be
//! driven from integration tests.
//!
//! # Data flow
//!
//! Handlers edit the in-memory [`workspace::Workspace`] and notify the
//! [`autosave`] task, which is the only writer to the configured
//! [`backend::Backend`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod autosave;
pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod workspace;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use middleware::create_session_layer;
use state::AppState;

/// Build the application router with sessions and request tracing.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
