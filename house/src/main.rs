//! Auction house server.
//!
//! Runs one house (`--role caller|callee`) or, with `--pair`, both houses of
//! an auction in one process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use house::config::{self, AuctionConfig, HouseSettings, Role};
use house::{HouseOptions, HouseServer, JsonFileStore, LogStore, PeerLink, WinnerStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replicated two-house auction server
#[derive(Parser, Debug)]
#[command(name = "auction-house")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Auction configuration file
    #[arg(short, long, env = config::AUCTION_CONFIG_ENV)]
    config: PathBuf,

    /// Which house to run (caller dials, callee accepts)
    #[arg(short, long, default_value = "caller")]
    role: Role,

    /// Port this house listens on for bidders
    #[arg(short, long)]
    port: Option<u16>,

    /// Port of the other house
    #[arg(long)]
    peer_port: Option<u16>,

    /// Host of the other house
    #[arg(long, default_value = config::DEFAULT_PEER_HOST)]
    peer_host: String,

    /// JSON results file. Results are only logged when absent.
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Run the caller and the callee together in this process
    #[arg(long, default_value_t = false)]
    pair: bool,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_port(role: Role) -> u16 {
    match role {
        Role::Caller => config::DEFAULT_CALLER_PORT,
        Role::Callee => config::DEFAULT_CALLEE_PORT,
    }
}

async fn open_store(path: Option<&PathBuf>, role: Role) -> Result<Option<Arc<JsonFileStore>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    // Each house of a pair keeps its own results file.
    let path = path.with_file_name(format!(
        "{}-{}",
        role,
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results.json".to_string())
    ));
    let store = JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open store {}", path.display()))?;
    Ok(Some(Arc::new(store)))
}

/// A house's options plus the results file to sync once it stops.
async fn options(
    cli: &Cli,
    auction: &AuctionConfig,
    role: Role,
) -> Result<(HouseOptions, Option<Arc<JsonFileStore>>)> {
    let port = match (cli.pair, role) {
        (true, Role::Callee) => cli.peer_port.unwrap_or(config::DEFAULT_CALLEE_PORT),
        _ => cli.port.unwrap_or_else(|| default_port(role)),
    };
    let peer = match role {
        Role::Caller => {
            let peer_port = cli.peer_port.unwrap_or(config::DEFAULT_CALLEE_PORT);
            PeerLink::Dial(format!("{}:{}", cli.peer_host, peer_port))
        }
        Role::Callee => PeerLink::Accept,
    };
    let results = open_store(cli.store.as_ref(), role).await?;
    let store: Arc<dyn WinnerStore> = match &results {
        Some(results) => results.clone(),
        None => Arc::new(LogStore),
    };
    let options = HouseOptions {
        role,
        listen: format!("0.0.0.0:{port}"),
        peer,
        settings: HouseSettings::from(auction),
        items: auction.items.clone(),
        store,
    };
    Ok((options, results))
}

async fn run_one(
    (options, results): (HouseOptions, Option<Arc<JsonFileStore>>),
    cancel: CancellationToken,
) -> Result<()> {
    let role = options.role;
    let server = HouseServer::bind(options)
        .await
        .with_context(|| format!("Failed to start the {role} house"))?;
    let outcome = server.run(cancel).await;
    if let Some(results) = results {
        if let Err(e) = results.sync().await {
            warn!("Results of the {} house may be incomplete: {}", role, e);
        }
    }
    outcome?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let auction = AuctionConfig::load(&cli.config)?;
    info!(
        "Loaded {} items from {}, {}s rounds",
        auction.items.len(),
        cli.config.display(),
        auction.round_secs
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                cancel.cancel();
            }
        });
    }

    let result = if cli.pair {
        let callee = options(&cli, &auction, Role::Callee).await?;
        let caller = options(&cli, &auction, Role::Caller).await?;
        tokio::try_join!(run_one(callee, cancel.clone()), run_one(caller, cancel.clone()))
            .map(|_| ())
    } else {
        run_one(options(&cli, &auction, cli.role).await?, cancel).await
    };

    if let Err(e) = &result {
        error!("House failed: {:#}", e);
    }
    result
}
