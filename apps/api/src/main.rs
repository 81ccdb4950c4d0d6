mod config;
mod errors;
mod figma;
mod generation;
mod layout;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::figma::FigmaClient;
use crate::generation::generator::Generator;
use crate::generation::workflow::RepairLoop;
use crate::llm_client::{LayoutModel, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "maquette",
    version,
    about = "Generate Figma-compatible UI layouts from natural language"
)]
struct Cli {
    /// Natural-language description of the layout. Omit to start the HTTP server.
    prompt: Option<String>,

    /// Override the repair-loop retry budget for this run
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Write the result JSON to this path instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("maquette_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize LLM client — the workflow's only outbound suspension point.
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    );
    let model: Arc<dyn LayoutModel> = Arc::new(llm);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    match cli.prompt {
        Some(ref prompt) => run_once(model, &config, prompt, &cli).await,
        None => serve(model, config).await,
    }
}

/// One-shot CLI mode: run a single workflow and print or write the report.
async fn run_once(
    model: Arc<dyn LayoutModel>,
    config: &Config,
    prompt: &str,
    cli: &Cli,
) -> Result<()> {
    let retry_limit = cli.retry_limit.unwrap_or(config.retry_limit);
    let workflow = RepairLoop::new(Generator::new(model), retry_limit);

    let report = workflow.run(prompt).await;

    match &cli.output {
        // Pass-through write of the artifact's canonical bytes.
        Some(path) => match &report.artifact {
            Some(artifact) => {
                std::fs::write(path, artifact.to_bytes()?)?;
                info!("Artifact written to {}", path.display());
            }
            None => warn!("No artifact to write (generation produced no candidate)"),
        },
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_succeeded() {
        anyhow::bail!(
            "layout generation failed after {} attempt(s) with {} outstanding violation(s)",
            report.attempts,
            report.violations.len()
        );
    }

    Ok(())
}

/// Server mode: expose the workflow over HTTP.
async fn serve(model: Arc<dyn LayoutModel>, config: Config) -> Result<()> {
    info!("Starting Maquette API v{}", env!("CARGO_PKG_VERSION"));

    let figma = if config.figma_enabled() {
        let client = FigmaClient::new(
            config.figma_access_token.clone().unwrap_or_default(),
            config.figma_file_key.clone().unwrap_or_default(),
        );
        // Credentials check up front; a failure here only warns — export
        // remains best-effort per request.
        if let Err(e) = client.get_file().await {
            warn!("Figma connectivity check failed: {e}");
        }
        info!("Figma export enabled");
        Some(client)
    } else {
        info!("Figma export disabled (no FIGMA_ACCESS_TOKEN / FIGMA_FILE_KEY)");
        None
    };

    let state = AppState {
        model,
        figma,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
