//! Local gateway: serve a registry's routes over HTTP for development.
//!
//! The production event router is the provider's gateway; this one matches
//! requests the same way, builds the same event shape, and passes the
//! resolved entry straight into the dispatcher.

pub mod console;
pub mod router;

use std::sync::Arc;

pub use console::{print_routes, route_rows};
pub use router::{app_router, execute, match_route, RuntimeState};

pub const DEFAULT_PORT: u16 = 8787;

/// Bind and serve until shutdown.
pub async fn serve(state: Arc<RuntimeState>, port: u16) -> Result<(), String> {
    let _ = tracing_subscriber::fmt::try_init();

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|err| format!("failed to bind port {}: {}", port, err))?;
    stdio::log(
        "gateway",
        &format!("listening on http://127.0.0.1:{}", port),
    );
    stdio::log(
        "gateway",
        &format!("{} routes registered", state.registry.len()),
    );

    axum::serve(listener, app_router(state))
        .await
        .map_err(|err| format!("server error: {}", err))
}
