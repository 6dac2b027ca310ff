//! Fincoach Session Proxy
//!
//! A stateless pass-through between the UI and the coaching backend's
//! plain-HTTP surface. Session create/list/delete and goal submission
//! are forwarded verbatim; upstream failures surface as a generic 500
//! with a JSON error body, unsupported verbs as 405 with an `Allow`
//! header. Nothing is cached or retried here.

pub mod routes;
pub mod upstream;

pub use routes::{router, ProxyError};
pub use upstream::Upstream;

/// Serve the proxy on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    upstream: Upstream,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(
        component = "proxy",
        event = "proxy.listening",
        addr = %addr,
        "Session proxy listening"
    );
    axum::serve(listener, router(upstream)).await
}
