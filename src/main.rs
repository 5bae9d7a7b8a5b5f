use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookvault::{
    commands::{
        extract_metadata::print_metadata,
        migrate_storage::{migrate_local_to_remote, MigrationOptions},
    },
    config::Config,
    create_app,
    db::{BookRecordStore, Database, MemoryBookStore},
    services::book_service::BookService,
    storage::{
        factory::{create_storage_backend, storage_config_from_env},
        local::LocalStorageBackend,
    },
    AppState,
};

#[derive(Parser)]
#[command(name = "bookvault")]
#[command(about = "Book storage and retrieval service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Print the metadata embedded in a PDF as JSON
    ExtractMetadata {
        path: PathBuf,
    },
    /// Re-upload locally stored books to the configured remote backend
    MigrateStorage {
        /// Only show what would be migrated
        #[arg(short, long)]
        dry_run: bool,
        /// Delete local files after a successful upload
        #[arg(long)]
        delete_local: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookvault=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Migrate => {
            let config = Config::from_env()?;
            let db = Database::new(&config.database_url)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await?;
            info!("✅ Migrations applied");
            Ok(())
        }
        Commands::ExtractMetadata { path } => print_metadata(&path).await,
        Commands::MigrateStorage { dry_run, delete_local } => {
            let config = Config::from_env()?;
            let store = open_store(&config).await?;
            let remote = create_storage_backend(storage_config_from_env(&config)?).await?;
            let local = LocalStorageBackend::new(&config.upload_path);

            let report = migrate_local_to_remote(
                store.as_ref(),
                &local,
                remote.as_ref(),
                MigrationOptions { dry_run, delete_local },
            )
            .await?;

            if report.failed > 0 {
                anyhow::bail!("{} books could not be migrated", report.failed);
            }
            Ok(())
        }
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn BookRecordStore>> {
    if config.uses_memory_store() {
        warn!("⚠️  Using the in-memory record store; books are lost on restart");
        return Ok(Arc::new(MemoryBookStore::new()));
    }

    info!("📊 Connecting to database...");
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(Arc::new(db))
}

async fn serve() -> Result<()> {
    let config = Config::from_env()?;

    let store = open_store(&config).await?;
    let storage = create_storage_backend(storage_config_from_env(&config)?).await?;
    info!("📁 Storage backend: {}", storage.storage_type());

    let book_service = Arc::new(BookService::new(store, storage));
    let state = Arc::new(AppState {
        config: config.clone(),
        book_service,
    });
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address))?;
    info!("🚀 Server listening on {}", config.server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
