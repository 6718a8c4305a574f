use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use talentmatch::{build_stack, JobProfile, SearchIntent, SearchOutcome, TalentConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "talentmatch",
    version,
    about = "Hybrid vector and text candidate retrieval over Solr"
)]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `retrieval=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a search intent against one or more collections
    Search {
        /// Intent as inline JSON or a path to a JSON file
        #[arg(short, long)]
        intent: String,

        /// Collections to search (defaults from the configuration)
        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,
    },
    /// Embed a job profile and search with it
    Profile {
        /// Profile as inline JSON or a path to a JSON file
        #[arg(short, long)]
        profile: String,

        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,
    },
    /// Delete every document in a collection
    Clear { collection: String },
    /// Check that a collection is reachable
    Ping { collection: String },
    /// Start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    if matches!(args.command, Command::Serve) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = TalentConfig::load(args.config.as_deref()).context("loading configuration")?;
    let stack = build_stack(&config).context("building retrieval stack")?;

    match args.command {
        Command::Search {
            intent,
            collections,
        } => {
            let intent: SearchIntent = read_json_arg(&intent)?;
            let outcome = stack.session.search(&intent, collections.as_slice()).await?;
            report(&outcome)?;
        }
        Command::Profile {
            profile,
            collections,
        } => {
            let profile: JobProfile = read_json_arg(&profile)?;
            let intent = stack.profiles.build(&profile).await?;
            let outcome = stack.session.search(&intent, collections.as_slice()).await?;
            report(&outcome)?;
        }
        Command::Clear { collection } => {
            stack.session.store().delete_all(&collection).await?;
            tracing::info!(collection = %collection, "collection_cleared");
        }
        Command::Ping { collection } => {
            stack.session.store().ping(&collection).await?;
            println!("{collection}: ok");
        }
        Command::Serve => {
            let server_config = server::ServerConfig::load()?;
            server::start_server(
                server_config,
                Arc::clone(&stack.session),
                Arc::clone(&stack.profiles),
            )
            .await?;
        }
    }

    Ok(())
}

/// Inline JSON when the argument looks like an object, otherwise a file path.
fn read_json_arg<T: DeserializeOwned>(arg: &str) -> anyhow::Result<T> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).context("parsing inline JSON");
    }
    let path = Path::new(arg);
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn report(outcome: &SearchOutcome) -> anyhow::Result<()> {
    print_json(outcome)?;
    for failure in &outcome.failures {
        tracing::warn!(
            collection = %failure.collection,
            kind = failure.kind,
            attempts = failure.attempts,
            "collection_failed"
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
