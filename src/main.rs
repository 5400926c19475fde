use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use versions::{api, config::ServerConfig, db};

#[derive(Parser)]
#[command(name = "versions")]
#[command(about = "Release changelog tracking server")]
struct Cli {
    /// SQLite database file (defaults to VERSIONS_DATABASE or the platform data dir)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Interface to bind (defaults to VERSIONS_HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP API (defaults to VERSIONS_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending schema migrations and exit
    Migrate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "versions=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = ServerConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database = database;
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database at {} is up to date", config.database.display());
        }
        // Default: start server
        None => serve(config).await?,
    }

    Ok(())
}

fn open_database(config: &ServerConfig) -> anyhow::Result<db::Database> {
    tracing::info!("Opening database at {}", config.database.display());
    let db = db::Database::open(&config.database)
        .with_context(|| format!("Failed to open {}", config.database.display()))?;
    db.migrate()?;
    Ok(db)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    let app = api::create_router_with_cors(db, config.cors_origins.as_deref());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Versions server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
