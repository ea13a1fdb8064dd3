//! `Staychat` sandbox backend.
//!
//! An axum HTTP server that mimics the marketplace messaging API against
//! an in-memory world. Exposed as a library so integration tests can run
//! a real HTTP round trip in-process.

pub mod config;
pub mod routes;
pub mod state;

use std::sync::Arc;

use state::SandboxState;

/// Starts the sandbox server on `addr`.
///
/// Returns the bound address (useful with port 0) and the server task
/// handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    state: Arc<SandboxState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "sandbox server error");
        }
    });

    Ok((bound_addr, handle))
}
