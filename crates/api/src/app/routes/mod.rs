use axum::Router;

pub mod access;
pub mod keys;
pub mod messages;
pub mod projects;
pub mod system;
pub mod things;

/// Identity service routes.
pub fn authn() -> Router {
    keys::router()
}

/// Identity service internal RPC.
pub fn authn_rpc() -> Router {
    keys::rpc_router()
}

/// Registry routes.
pub fn registry() -> Router {
    Router::new()
        .merge(things::router())
        .merge(projects::router())
}

/// Registry internal RPC.
pub fn registry_rpc() -> Router {
    access::router()
}

/// HTTP adapter routes.
pub fn adapter() -> Router {
    messages::router()
}
