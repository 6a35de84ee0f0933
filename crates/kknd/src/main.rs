//! kknd: the KKN autogroup daemon.
//!
//! Single binary that serves the REST API over the redb store and can run
//! a grouping offline from JSON files.
//!
//! # Usage
//!
//! ```text
//! kknd serve --config kkn.toml --port 4000 --data-dir /var/lib/kkn
//! kknd group --roster roster.json --locations lokasi.json \
//!     --cohort-name "KKN Reguler" --cohort-number 84
//! kknd init-config > kkn.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kkn_api::{ApiSettings, NullOracle, build_router};
use kkn_core::{AssignmentStrategy, FilterCriteria, KknConfig, Location, Student};
use kkn_grouping::{GroupingRequest, run_grouping};
use kkn_state::StateStore;
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,kknd=debug,kkn=debug";

#[derive(Parser)]
#[command(name = "kknd", about = "KKN autogroup daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    RoundRobin,
    CapacityAware,
}

impl From<StrategyArg> for AssignmentStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::RoundRobin => AssignmentStrategy::RoundRobin,
            StrategyArg::CapacityAware => AssignmentStrategy::CapacityAware,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Path to kkn.toml. Built-in defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the store (overrides `server.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Run one grouping from JSON files and print the result.
    Group {
        /// JSON array of students.
        #[arg(long)]
        roster: PathBuf,

        /// JSON array of locations.
        #[arg(long)]
        locations: PathBuf,

        /// JSON criteria object. Falls back to `[criteria]` in the config.
        #[arg(long)]
        criteria: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cohort_name: String,

        #[arg(long, default_value = "1")]
        cohort_number: u32,

        #[arg(long, allow_hyphen_values = true)]
        campus_lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        campus_lng: Option<f64>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Print a kkn.toml with every default filled in.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = data_dir {
                config.server.data_dir = dir;
            }
            run_server(config).await
        }
        Command::Group {
            roster,
            locations,
            criteria,
            config,
            cohort_name,
            cohort_number,
            campus_lat,
            campus_lng,
            strategy,
        } => {
            let config = load_config(config.as_deref())?;
            let mut campus = config.campus;
            if let Some(lat) = campus_lat {
                campus.latitude = lat;
            }
            if let Some(lng) = campus_lng {
                campus.longitude = lng;
            }
            let criteria = match criteria {
                Some(path) => load_json::<FilterCriteria>(&path)?,
                None => config.criteria.clone(),
            };
            let request = GroupingRequest {
                cohort_name,
                cohort_number,
                campus,
                roster: load_json::<Vec<Student>>(&roster)?,
                criteria,
                locations: load_json::<Vec<Location>>(&locations)?,
                strategy: strategy.map_or(config.assignment.strategy, AssignmentStrategy::from),
            };
            let result = run_grouping(&request)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::InitConfig => {
            print!("{}", KknConfig::scaffold().to_toml_string()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so `group` output stays clean JSON on stdout.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<KknConfig> {
    let mut config = match path {
        Some(path) => KknConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => KknConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

async fn run_server(config: KknConfig) -> anyhow::Result<()> {
    info!("KKN autogroup daemon starting");

    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join("kkn.redb");

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    if let Some(seeded) = store.seed_default_criteria(&config.criteria)? {
        info!(id = seeded.id, name = %seeded.criteria.name, "default criteria seeded");
    }

    let settings = ApiSettings::from(&config);
    info!(
        lat = settings.campus.latitude,
        lng = settings.campus.longitude,
        strategy = ?settings.strategy,
        "campus configured"
    );

    let router = build_router(store, settings, Arc::new(NullOracle));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("KKN autogroup daemon stopped");
    Ok(())
}
