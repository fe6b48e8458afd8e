//! Brickyard - Cluster Metadata Service
//!
//! Serves the cluster REST API on top of the embedded entry store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brickyard::allocator::MemoryAllocator;
use brickyard::api::HttpServer;
use brickyard::config::BrickyardConfig;
use brickyard::error::Result;
use brickyard::service::ClusterService;
use brickyard::store::EntryStore;

/// Brickyard - Cluster Metadata Service
#[derive(Parser)]
#[command(name = "brickyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "brickyard.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the metadata service
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "brickyard.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show effective configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => run_start(cli.config, cli.log_level).await,
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Start the metadata service
async fn run_start(config_path: PathBuf, log_level: Option<String>) -> Result<()> {
    let config = match BrickyardConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(e);
        }
    };

    let level = log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format);
    tracing::info!("Starting Brickyard...");

    let store = match EntryStore::open(&config.db_path(), config.store.busy_timeout()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open entry store {:?}: {}", config.db_path(), e);
            return Err(e);
        }
    };

    let allocator = Arc::new(MemoryAllocator::new());
    allocator.load_from_store(&store).await?;

    let service = Arc::new(ClusterService::new(Arc::clone(&store), allocator));
    let server = HttpServer::new(config.api.clone(), service);

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP API error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# Brickyard Configuration
# Generated configuration file

[store]
data_dir = "/var/lib/brickyard"
db_file = "brickyard.db"
busy_timeout_ms = 5000

[api]
enabled = true
bind_address = "0.0.0.0:8080"
cors_enabled = false

[logging]
level = "info"
# pretty, compact or json
format = "pretty"
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: brickyard --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match BrickyardConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Database: {}", config.db_path().display());
            println!("  API: {}", config.api.bind_address);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show effective configuration
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = BrickyardConfig::from_file(&config_path)?;

    println!("Brickyard Configuration");
    println!("=======================");
    println!();
    println!("Store:");
    println!("  Database:       {}", config.db_path().display());
    println!("  Busy Timeout:   {} ms", config.store.busy_timeout_ms);
    println!();
    println!("API:");
    println!("  Enabled:        {}", config.api.enabled);
    println!("  Bind Address:   {}", config.api.bind_address);
    println!("  CORS:           {}", config.api.cors_enabled);
    println!();
    println!("Logging:");
    println!("  Level:          {}", config.logging.level);
    println!("  Format:         {}", config.logging.format);

    Ok(())
}
