//! Example: correlating log lines of one request, including work that outlives it
//!
//! Run with `RUST_LOG=info cargo run --example log_correlation`

use std::time::Duration;

use request_id::{
    current_request_id, request_span, spawn_detached, with_request_id, RequestIdGenerator,
};
use tracing::Instrument;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let generator = RequestIdGenerator::new();
    tracing::info!(node_id = generator.node_id(), "Generator ready");

    let mut background = Vec::new();
    for path in ["/users", "/orders", "/health"] {
        let id = generator.next_id();
        let task = with_request_id(id, handle(path))
            .instrument(request_span(&id))
            .await;
        background.push(task);
    }

    for task in background {
        let _ = task.await;
    }

    tracing::info!(issued = generator.issued(), "Done");
}

async fn handle(path: &'static str) -> tokio::task::JoinHandle<()> {
    tracing::info!(path, "Handling request");

    // The audit write finishes after the response; its log line keeps the request ID.
    spawn_detached(async move {
        let id = current_request_id();
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tracing::info!(path, "Audit record written");
        }
        .instrument(request_span(&id))
        .await;
    })
}
