//! BrickCtl - Command line client for the Brickyard cluster API
//!
//! Usage:
//!   brickctl cluster create        - Create an empty cluster
//!   brickctl cluster list          - List cluster ids
//!   brickctl cluster info <id>     - Show a cluster and its dependents
//!   brickctl cluster delete <id>   - Delete an empty cluster

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use brickyard::api::{ClusterInfoResponse, ClusterListResponse, ErrorResponse};

/// Brickyard Cluster Control Tool
#[derive(Parser)]
#[command(name = "brickctl")]
#[command(about = "Manage clusters through the Brickyard API", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "/etc/brickyard/brickyard.toml")]
    config: PathBuf,

    /// API endpoint to connect to (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster operations
    Cluster {
        #[command(subcommand)]
        action: ClusterCommand,
    },
}

#[derive(Subcommand)]
enum ClusterCommand {
    /// Create an empty cluster
    Create,
    /// List all clusters
    List,
    /// Show cluster details
    Info {
        /// Cluster id
        id: String,
    },
    /// Delete a cluster (must have no nodes or volumes)
    Delete {
        /// Cluster id
        id: String,
    },
}

// ============ Config ============

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    api: ApiConfig,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfig {
    #[serde(default = "default_api_bind")]
    bind_address: String,
}

fn default_api_bind() -> String {
    "0.0.0.0:8080".to_string()
}

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

/// Work out which API endpoint to talk to
fn resolve_endpoint(cli: &Cli) -> String {
    if let Some(e) = &cli.endpoint {
        return e.trim_end_matches('/').to_string();
    }

    let Ok(content) = std::fs::read_to_string(&cli.config) else {
        return DEFAULT_ENDPOINT.to_string();
    };

    match toml::from_str::<Config>(&content) {
        Ok(config) => endpoint_from_bind(&config.api.bind_address),
        Err(_) => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Convert a bind address into something a client can connect to
fn endpoint_from_bind(addr: &str) -> String {
    if addr.starts_with("0.0.0.0") {
        format!("http://127.0.0.1:{}", addr.split(':').nth(1).unwrap_or("8080"))
    } else {
        format!("http://{}", addr)
    }
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = resolve_endpoint(&cli);
    let client = reqwest::Client::new();

    let result = match &cli.command {
        Commands::Cluster { action } => match action {
            ClusterCommand::Create => cluster_create(&client, &endpoint, cli.json).await,
            ClusterCommand::List => cluster_list(&client, &endpoint, cli.json).await,
            ClusterCommand::Info { id } => cluster_info(&client, &endpoint, id, cli.json).await,
            ClusterCommand::Delete { id } => cluster_delete(&client, &endpoint, id).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

type CmdResult = Result<(), Box<dyn std::error::Error>>;

async fn cluster_create(client: &reqwest::Client, endpoint: &str, json: bool) -> CmdResult {
    let response = client.post(format!("{}/clusters", endpoint)).send().await?;
    let info: ClusterInfoResponse = check(response).await?.json().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Cluster id: {}", info.id);
    }
    Ok(())
}

async fn cluster_list(client: &reqwest::Client, endpoint: &str, json: bool) -> CmdResult {
    let response = client.get(format!("{}/clusters", endpoint)).send().await?;
    let list: ClusterListResponse = check(response).await?.json().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else if list.clusters.is_empty() {
        println!("No clusters");
    } else {
        println!("Clusters:");
        for id in &list.clusters {
            println!("  {}", id);
        }
    }
    Ok(())
}

async fn cluster_info(client: &reqwest::Client, endpoint: &str, id: &str, json: bool) -> CmdResult {
    let response = client
        .get(format!("{}/clusters/{}", endpoint, id))
        .send()
        .await?;
    let info: ClusterInfoResponse = check(response).await?.json().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Cluster id: {}", info.id);
    println!("Nodes:");
    for node in &info.nodes {
        println!("  {}", node);
    }
    println!("Volumes:");
    for volume in &info.volumes {
        println!("  {}", volume);
    }
    Ok(())
}

async fn cluster_delete(client: &reqwest::Client, endpoint: &str, id: &str) -> CmdResult {
    let response = client
        .delete(format!("{}/clusters/{}", endpoint, id))
        .send()
        .await?;
    check(response).await?;

    println!("Cluster {} deleted", id);
    Ok(())
}

/// Turn a non-2xx response into an error carrying the server's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => err.error,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body,
    };
    Err(format!("{} ({})", message, status).into())
}
