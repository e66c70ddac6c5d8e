//! Parapal - rubric grading from the command line
//!
//! ## Commands
//!
//! - `grade`: grade one event (the same JSON the service receives)
//! - `batch`: grade a batch event, optionally saving each result
//! - `validate`: run the validator over a saved model completion
//! - `prompt`: print the prompt that would be sent for an essay

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parapal_core::{
    build_grading_prompt, validate_completion, ConverseClient, Envelope, FsResultStore, Grader,
    GraderConfig, ResultStore, DEFAULT_RUBRIC,
};
use serde_json::Value;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "parapal")]
#[command(author = "Parapal Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade student submissions against a rubric with an LLM", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML config file (environment variables still override it)
    #[arg(short, long, global = true, env = "PARAPAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single submission event
    Grade {
        /// Event JSON file, or `-` for stdin
        #[arg(short, long)]
        event: PathBuf,
    },

    /// Grade every document of a batch event
    Batch {
        /// Event JSON file, or `-` for stdin
        #[arg(short, long)]
        event: PathBuf,

        /// Save each result under DIR/results/ (overrides `results_dir`)
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },

    /// Validate a saved model completion without calling the model
    Validate {
        /// Completion text file, or `-` for stdin
        #[arg(long)]
        completion: PathBuf,
    },

    /// Print the prompt built for an essay
    Prompt {
        /// Essay text file, or `-` for stdin
        #[arg(short, long)]
        essay: PathBuf,

        /// Rubric text (default rubric when omitted)
        #[arg(short, long)]
        rubric: Option<String>,

        /// Standard to grade against (repeatable)
        #[arg(short, long = "standard")]
        standards: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    parapal_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Grade { event } => cmd_grade(&config, &event).await,
        Commands::Batch { event, results_dir } => {
            cmd_batch(&config, &event, results_dir.as_deref()).await
        }
        Commands::Validate { completion } => cmd_validate(&config, &completion),
        Commands::Prompt {
            essay,
            rubric,
            standards,
        } => cmd_prompt(&essay, rubric.as_deref(), &standards),
    }
}

fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    let config = match path {
        Some(path) => GraderConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => GraderConfig::from_env().context("Invalid configuration in environment")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_grader(config: &GraderConfig) -> Result<Grader> {
    let client = ConverseClient::new(config).context("Failed to build inference client")?;
    info!(model_id = %config.model_id, url = %client.url(), "inference client ready");
    Ok(Grader::new(Arc::new(client), config.validation_policy()))
}

async fn cmd_grade(config: &GraderConfig, event_path: &Path) -> Result<ExitCode> {
    let event = read_event(event_path)?;
    let grader = build_grader(config)?;

    let envelope = grader.handle_event(&event).await;
    print_envelope(&envelope)
}

async fn cmd_batch(
    config: &GraderConfig,
    event_path: &Path,
    results_dir: Option<&Path>,
) -> Result<ExitCode> {
    let event = read_event(event_path)?;
    let grader = build_grader(config)?;

    let store = match results_dir.or(config.results_dir.as_deref()) {
        Some(dir) => Some(
            FsResultStore::new(dir)
                .with_context(|| format!("Failed to open results directory {:?}", dir))?,
        ),
        None => None,
    };

    let envelope = grader
        .handle_batch_event(&event, store.as_ref().map(|s| s as &dyn ResultStore))
        .await;
    print_envelope(&envelope)
}

fn cmd_validate(config: &GraderConfig, completion_path: &Path) -> Result<ExitCode> {
    let raw = read_input(completion_path)?;
    let outcome = validate_completion(&raw, &config.validation_policy());

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(if outcome.is_graded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_prompt(essay_path: &Path, rubric: Option<&str>, standards: &[String]) -> Result<ExitCode> {
    let essay = read_input(essay_path)?;
    let prompt = build_grading_prompt(&essay, rubric.unwrap_or(DEFAULT_RUBRIC), standards);

    println!("--- system ---\n{}\n", prompt.system);
    println!("--- user ---\n{}", prompt.user);
    Ok(ExitCode::SUCCESS)
}

fn print_envelope(envelope: &Envelope) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Read a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn read_event(path: &Path) -> Result<Value> {
    let content = read_input(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid event JSON in {:?}", path))
}
