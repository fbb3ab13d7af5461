//! Ontosearch command line
//!
//! Activates the Elasticsearch search backend and manages its indices.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use ontosearch::query::SortDirection;
use ontosearch::{Report, SearchAuth, SearchConfig, SearchService};
use tracing::{error, info};

/// Resource type that no index serves; used to check the engine.
const HEALTH_CHECK_RESOURCE_TYPE: &str = "sample";

#[derive(Debug, Parser)]
#[command(name = "ontosearch")]
#[command(about = "Search backend activation and index management")]
struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ONTOSEARCH_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Existing configuration file to start from.
    #[arg(long, env = "ONTOSEARCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Creates the indices and switches the host to the search backend.
    Activate(ActivateArgs),
    /// Creates the indices declared in a definition file.
    CreateIndices(CreateIndicesArgs),
}

#[derive(Debug, Args)]
struct ActivateArgs {
    /// Engine URL.
    #[arg(env = "ONTOSEARCH_URL")]
    url: Option<String>,

    /// Engine port, appended when the URL has none.
    port: Option<u16>,

    #[arg(env = "ONTOSEARCH_USER")]
    user: Option<String>,

    #[arg(env = "ONTOSEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Index definition file; the built-in definitions are used when absent.
    #[arg(short = 'f', long)]
    index_file: Option<PathBuf>,

    /// Where to write the active configuration on success.
    #[arg(short, long)]
    output_config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CreateIndicesArgs {
    /// Absolute path to the index declarations.
    #[arg(short = 'f', long)]
    index_file: PathBuf,
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ontosearch={level},ontosearch_cli={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn base_config(path: Option<&Path>) -> anyhow::Result<SearchConfig> {
    match path {
        Some(path) => Ok(SearchConfig::load(path)?),
        None => Ok(SearchConfig::default()),
    }
}

fn activation_config(mut config: SearchConfig, args: &ActivateArgs) -> SearchConfig {
    if let Some(ref url) = args.url {
        config = config.with_host(url, args.port);
    }
    if let Some(ref username) = args.user {
        config.auth = Some(SearchAuth::Basic {
            username: username.clone(),
            password: args.password.clone().unwrap_or_default(),
        });
    }
    if let Some(ref index_file) = args.index_file {
        config.index_file = Some(index_file.clone());
    }
    config
}

async fn activate(service: &SearchService, output_config: Option<&Path>) -> Report {
    let mut children = Vec::new();

    match service.create_configured_indexes().await {
        Ok(count) => children.push(Report::info(format!("{count} indices ready"))),
        Err(e) => {
            error!(error = %e, "Index creation failed");
            return Report::error(format!("Error while indices creation: {e}"));
        }
    }

    let health = service
        .query("", HEALTH_CHECK_RESOURCE_TYPE, 0, 10, "_id", SortDirection::Descending)
        .await;
    if let Err(e) = health {
        error!(error = %e, host = %service.config().primary_host(), "Health check query failed");
        return Report::error("Elasticsearch server could not be found");
    }

    if let Some(path) = output_config {
        match service.config().save(path) {
            Ok(()) => children.push(Report::info(format!(
                "Configuration written to {}",
                path.display()
            ))),
            Err(e) => children.push(Report::error(e.to_string())),
        }
    }

    info!(host = %service.config().primary_host(), "Search backend activated");
    let mut report = Report::success("Switched to Elasticsearch");
    for child in children {
        report.add(child);
    }
    report
}

async fn create_indices(service: &SearchService, index_file: &Path) -> Report {
    match service.create_indexes_from_file(index_file).await {
        Ok(count) => {
            info!(count, path = %index_file.display(), "Indices created");
            Report::success("Elastic indices created successfully")
        }
        Err(e) => Report::error(format!("Error while indices creation: {e}")),
    }
}

#[cfg(feature = "elasticsearch")]
fn connect(config: SearchConfig) -> anyhow::Result<SearchService> {
    Ok(SearchService::from_config(config)?)
}

/// Fallback when the elasticsearch feature is not enabled.
#[cfg(not(feature = "elasticsearch"))]
fn connect(_config: SearchConfig) -> anyhow::Result<SearchService> {
    anyhow::bail!(
        "The search backend requires the 'elasticsearch' feature. \
         Build with: cargo build -p ontosearch-cli --features elasticsearch"
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = base_config(cli.config.as_deref())?;

    let report = match cli.command {
        Command::Activate(ref args) => {
            let config = activation_config(config, args);
            info!(host = %config.primary_host(), "Activating search backend");
            let service = connect(config)?;
            activate(&service, args.output_config.as_deref()).await
        }
        Command::CreateIndices(ref args) => {
            let service = connect(config)?;
            create_indices(&service, &args.index_file).await
        }
    };

    print!("{report}");
    if report.contains_error() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
