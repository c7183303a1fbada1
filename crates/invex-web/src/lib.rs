//! Web form for invoice extraction.
//!
//! One request carries one file through the shared pipeline and answers
//! with a results table plus CSV and JSON downloads. A JSON/CSV API exposes
//! the same call for scripts.

mod handlers;
mod routes;
mod templates;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use invex_core::InvoicePipeline;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for the web server. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InvoicePipeline>,
}

impl AppState {
    pub fn new(pipeline: InvoicePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Whether the form offers the "use LLM" switch.
    pub fn llm_available(&self) -> bool {
        self.pipeline.refinement_active()
    }
}

/// Start the web server.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
