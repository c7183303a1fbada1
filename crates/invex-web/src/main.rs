//! invex web server.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use invex_core::{InvexConfig, InvoicePipeline, PipelineOptions};
use invex_web::AppState;

/// Serve the invoice extraction form.
#[derive(Parser)]
#[command(name = "invex-web")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 7860)]
    port: u16,

    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never offer LLM refinement
    #[arg(long)]
    no_llm: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => InvexConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?,
        None => InvexConfig::default(),
    }
    .with_env_overrides();

    let options = PipelineOptions::resolve(&config, args.no_llm, false);
    let state = AppState::new(InvoicePipeline::new(config, options));
    info!(
        "LLM refinement {}",
        if state.llm_available() { "available" } else { "unavailable" }
    );

    invex_web::serve(state, &args.host, args.port).await
}
