use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tally_lite::analysis::{Analysis, AnalysisKind, Parameters};
use tally_lite::config::{PoolConfig, ServerConfig};
use tally_lite::dataset::Dataset;
use tally_lite::node::Node;
use tally_lite::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "tally-lite")]
#[command(version)]
#[command(about = "Asynchronous statistics jobs over a fixed worker pool")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the job server
    Serve(ServeArgs),

    /// Run a single analysis synchronously and print the result
    Analyze(AnalyzeArgs),
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to listen on for HTTP
    #[arg(long, default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// CSV file to load into memory
    #[arg(long, default_value = "./nutrition_activity_obesity_usa_subset.csv")]
    dataset: PathBuf,

    /// Directory for per-job result files
    #[arg(long, default_value = "./results")]
    results_dir: PathBuf,

    /// Number of worker threads [default: $TP_NUM_OF_THREADS, then available parallelism]
    #[arg(long)]
    workers: Option<usize>,

    /// Seconds to keep answering polls after the queue has drained
    #[arg(long, default_value = "2")]
    linger_secs: u64,
}

// =============================================================================
// Analyze Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// CSV file to load into memory
    #[arg(long, default_value = "./nutrition_activity_obesity_usa_subset.csv")]
    dataset: PathBuf,

    /// Analysis to run (e.g. states_mean, best5, mean_by_category)
    #[arg(long, value_parser = parse_kind)]
    kind: AnalysisKind,

    /// Question identifier
    #[arg(long)]
    question: String,

    /// Location, for the state_* analyses
    #[arg(long)]
    state: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "json")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn parse_kind(s: &str) -> Result<AnalysisKind, String> {
    s.parse::<AnalysisKind>().map_err(|e| e.to_string())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pool = match args.workers {
        Some(n) if n > 0 => PoolConfig::new(n),
        Some(_) => {
            tracing::warn!("Worker count must be positive, using available parallelism");
            PoolConfig::default()
        }
        None => PoolConfig::from_env(),
    };

    let config = ServerConfig {
        listen_addr: args.listen,
        dataset_path: args.dataset,
        ..ServerConfig::default()
    }
    .with_results_dir(args.results_dir)
    .with_pool(pool)
    .with_shutdown_linger(Duration::from_secs(args.linger_secs));

    tracing::info!(
        listen_addr = %config.listen_addr,
        dataset = %config.dataset_path.display(),
        results_dir = %config.results_dir.display(),
        workers = config.pool.workers,
        "Starting tally-lite server"
    );

    let dataset = Arc::new(Dataset::from_csv_path(&config.dataset_path)?);
    let node = Node::start(config, dataset)?;
    install_shutdown_handler(node.service().shutdown().clone())?;

    node.run().await
}

// =============================================================================
// Analyze Implementation
// =============================================================================

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = Dataset::from_csv_path(&args.dataset)?;
    let params = Parameters {
        question: args.question,
        state: args.state,
    };
    let analysis = Analysis::from_request(args.kind, params)?;
    let result = analysis.run(&dataset)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => print_table(&result, 0),
    }
    Ok(())
}

fn print_table(value: &Value, indent: usize) {
    let Some(entries) = value.as_object() else {
        println!("{:indent$}{}", "", value, indent = indent);
        return;
    };
    for (key, value) in entries {
        match value {
            Value::Object(_) => {
                println!("{:indent$}{}", "", key, indent = indent);
                print_table(value, indent + 2);
            }
            other => println!("{:indent$}{:<60} {}", "", key, other, indent = indent),
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Commands::Serve(serve_args) => {
            run_server(serve_args).await?;
        }
        Commands::Analyze(analyze_args) => {
            run_analyze(analyze_args)?;
        }
    }

    Ok(())
}
