//! Axum routers and service wiring.
//!
//! - `services.rs`: builds each service from its configuration
//! - `routes/`: HTTP routes and handlers (one file per resource)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: error taxonomy to HTTP status mapping

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use conduit_authn::AuthnService;
use conduit_http::AdapterService;
use conduit_things::ThingsService;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub fn authn_app(svc: Arc<AuthnService>) -> Router {
    finish("conduit-authn", routes::authn().layer(Extension(svc)))
}

/// Internal identity RPC. Bind it to a port only other services can reach.
pub fn authn_rpc_app(svc: Arc<AuthnService>) -> Router {
    finish("conduit-authn", routes::authn_rpc().layer(Extension(svc)))
}

pub fn things_app(svc: Arc<ThingsService>) -> Router {
    finish("conduit-things", routes::registry().layer(Extension(svc)))
}

/// Internal access-check RPC. Bind it to a port only other services can reach.
pub fn things_rpc_app(svc: Arc<ThingsService>) -> Router {
    finish("conduit-things", routes::registry_rpc().layer(Extension(svc)))
}

pub fn adapter_app(svc: Arc<AdapterService>) -> Router {
    finish("conduit-http", routes::adapter().layer(Extension(svc)))
}

fn finish(service: &'static str, routes: Router) -> Router {
    Router::new()
        .merge(routes::system::router(service))
        .merge(routes)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}

pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = format!("0.0.0.0:{port}");
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Serve `router` until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> anyhow::Result<()> {
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C so `axum::serve` can drain in-flight requests.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
