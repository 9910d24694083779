use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use infradocs_server::{
    config::Config,
    logging::{init_logging, Verbosity},
    mailer::LogMailer,
    store::{DocumentStore, MemoryDocumentStore, MemoryUserStore, UserStore},
    AppState,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "infradocs-server", version, about = "Infrastructure documentation server")]
struct Args {
    /// Path to a TOML configuration file (defaults to ./infradocs.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Verbosity::from_flags(args.quiet, args.verbose));

    let config = Config::load_from(args.config).context("Failed to load configuration")?;
    if config.auth.jwt_secret == "change-me" {
        warn!("Using the default JWT secret; set INFRADOCS_AUTH__JWT_SECRET in production");
    }

    let (docs, users): (Arc<dyn DocumentStore>, Arc<dyn UserStore>) =
        match (config.documents_path(), config.users_path()) {
            (Some(docs_path), Some(users_path)) => {
                info!("Persisting snapshots under {:?}", config.storage.data_dir);
                (
                    Arc::new(
                        MemoryDocumentStore::open(docs_path)
                            .await
                            .context("Failed to open document snapshot")?,
                    ),
                    Arc::new(
                        MemoryUserStore::open(users_path)
                            .await
                            .context("Failed to open user snapshot")?,
                    ),
                )
            }
            _ => {
                warn!("No storage.data_dir configured; data will not survive a restart");
                (
                    Arc::new(MemoryDocumentStore::new()),
                    Arc::new(MemoryUserStore::new()),
                )
            }
        };

    let addr = config.bind_addr()?;
    let state = AppState::new(docs, users, Arc::new(LogMailer), config);
    let app = infradocs_server::app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
