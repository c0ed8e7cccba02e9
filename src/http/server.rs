//! Auth server setup and dispatch.
//!
//! # Responsibilities
//! - Hold the active dispatch table and swap it on policy changes
//! - Dispatch each request to the handler registered at its path
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the server and serve until shutdown
//!
//! # Design Decisions
//! - The table is an immutable snapshot behind ArcSwap; request tasks
//!   load it lock-free and never observe a partial rebuild
//! - A failed rebuild keeps the previous table in service
//! - Unknown paths answer 404, which the fronting proxy treats as deny

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::acp::dispatch::{build_routes, DispatchTable};
use crate::acp::watcher::UpdateAcpFn;
use crate::observability::metrics;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    table: Arc<ArcSwap<DispatchTable>>,
}

/// HTTP server answering forward-auth requests for the active policies.
pub struct AuthServer {
    router: Router,
    table: Arc<ArcSwap<DispatchTable>>,
}

impl AuthServer {
    /// Create a server with an empty dispatch table.
    ///
    /// Every path answers 404 until the first successful table build.
    pub fn new(request_timeout: Duration) -> Self {
        let table = Arc::new(ArcSwap::from_pointee(DispatchTable::default()));

        let state = AppState {
            table: table.clone(),
        };

        let router = Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http());

        Self { router, table }
    }

    /// Update function rebuilding the dispatch table on policy changes.
    ///
    /// Intended to be registered with the watcher. A failed build is
    /// propagated and leaves the previous table in service.
    pub fn update_acp_fn(&self) -> UpdateAcpFn {
        let table = self.table.clone();
        Box::new(move |acps| {
            let new_table = build_routes(acps)?;
            tracing::info!(routes = new_table.len(), "Dispatch table rebuilt");
            table.store(Arc::new(new_table));
            Ok(())
        })
    }

    /// Serve on the given listener until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Auth server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
    }
}

async fn dispatch_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let table = state.table.load();

    let response = match table.handler(req.uri().path()) {
        Some(handler) => handler.handle(&req),
        None => StatusCode::NOT_FOUND.into_response(),
    };

    metrics::record_auth_request(response.status().as_u16());
    response
}
