use ledger_integrations::config::{HostSettings, IntegrationSpec};
use ledger_integrations::host::{IntegrationHost, NdjsonSink};
use ledger_integrations::server;
use ledger_integrations::webhook::WebhookRequest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledger-integration")]
#[command(about = "Host a ledger integration: tables, event logs, loopbacks and timers")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the integration's webhooks over HTTP
    Serve {
        /// Integration spec (JSON); defaults to $INTEGRATION_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address; defaults to $INTEGRATION_BIND_ADDR or 127.0.0.1:8089
        #[arg(short, long)]
        bind: Option<String>,

        /// Newline-delimited ledger events to feed, `-` for stdin
        #[arg(short, long)]
        events: Option<String>,
    },
    /// Replay recorded events through an integration and exit
    Replay {
        /// Integration spec (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Newline-delimited ledger events, `-` for stdin
        #[arg(short, long)]
        events: String,

        /// Webhook path to request after the replay, e.g. `/json`
        #[arg(short, long)]
        webhook: Option<String>,

        /// Timer ticks to fire after the replay
        #[arg(long, default_value_t = 0)]
        tick: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Commands go to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve { config, bind, events } => serve(config, bind, events).await,
        Commands::Replay { config, events, webhook, tick } => {
            replay(config, events, webhook, tick).await
        }
    }
}

fn build_host(config_path: &Path) -> Result<Arc<IntegrationHost>> {
    let spec = IntegrationSpec::load(config_path)
        .with_context(|| format!("Failed to load integration spec {}", config_path.display()))?;
    let integration = spec.build()?;
    info!("Loaded {} integration from {}", integration.kind(), config_path.display());
    Ok(Arc::new(IntegrationHost::new(
        integration,
        Arc::new(NdjsonSink::stdout()),
    )))
}

async fn open_events(source: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("Failed to open events {}", source))?;
    Ok(Box::new(BufReader::new(file)))
}

async fn serve(config: Option<PathBuf>, bind: Option<String>, events: Option<String>) -> Result<()> {
    let settings = HostSettings::from_env();
    let config_path = config
        .or(settings.config_path)
        .context("No integration spec: pass --config or set INTEGRATION_CONFIG")?;
    let bind_addr = bind.unwrap_or(settings.bind_addr);

    let host = build_host(&config_path)?;
    host.spawn_timer();

    if let Some(source) = events {
        let reader = open_events(&source).await?;
        let feeder = host.clone();
        tokio::spawn(async move {
            match feeder.run_events(reader).await {
                Ok(count) => info!("Event stream ended after {} events", count),
                Err(e) => error!("Event stream failed: {}", e),
            }
        });
    }

    for route in host.routes().await {
        info!("Webhook {:?} {} ({})", route.method, route.path(), route.label);
    }

    server::serve(host, &bind_addr).await?;
    Ok(())
}

async fn replay(config: PathBuf, events: String, webhook: Option<String>, tick: u32) -> Result<()> {
    let host = build_host(&config)?;

    let reader = open_events(&events).await?;
    let count = host.run_events(reader).await?;
    info!("Replayed {} events", count);

    for _ in 0..tick {
        host.fire_timer().await?;
    }

    if let Some(path) = webhook {
        let response = host.webhook(&WebhookRequest::get(&path)).await;
        if response.status != 200 {
            anyhow::bail!("Webhook {} returned {}: {}", path, response.status, response.body_text());
        }
        println!("{}", response.body_text());
    }

    Ok(())
}
