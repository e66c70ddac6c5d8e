//! parapald - HTTP grading service

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parapal_core::{ConverseClient, FsResultStore, Grader, GraderConfig, ResultStore};
use tracing::{info, Level};

mod routes;

use routes::AppState;

#[derive(Parser)]
#[command(name = "parapald")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parapal grading service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "PARAPALD_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// TOML config file (environment variables still override it)
    #[arg(short, long, env = "PARAPAL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    parapal_core::init_tracing(args.json, level);

    let config = match &args.config {
        Some(path) => GraderConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => GraderConfig::from_env().context("Invalid configuration in environment")?,
    };
    config.validate().context("Invalid configuration")?;

    let client = ConverseClient::new(&config).context("Failed to build inference client")?;
    info!(model_id = %config.model_id, url = %client.url(), "inference client ready");
    let grader = Grader::new(Arc::new(client), config.validation_policy());

    let store = match &config.results_dir {
        Some(dir) => {
            let store = FsResultStore::new(dir)
                .with_context(|| format!("Failed to open results directory {:?}", dir))?;
            info!(results_dir = %dir.display(), "saving batch results");
            Some(Arc::new(store) as Arc<dyn ResultStore>)
        }
        None => None,
    };

    let app = routes::app(AppState { grader, store });

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "parapald listening");

    axum::serve(listener, app).await?;
    Ok(())
}
