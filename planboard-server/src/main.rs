//! planboard-server - title planning board service
//!
//! Serves the board over HTTP, persists it to SQLite under the root folder and
//! optionally keeps it in sync with a shared document store.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use planboard_common::config::{self, SyncTransportKind, TomlConfig, ROOT_FOLDER_ENV};
use planboard_common::db::{init_database, BoardRepository, DATABASE_FILE_NAME};
use planboard_common::scoring::AuthorDirectory;
use planboard_common::service::DEFAULT_USER;
use planboard_common::sync::http::DEFAULT_TIMEOUT;
use planboard_common::sync::{HttpDocumentTransport, SyncAgent, SyncDocument, SyncTransport};
use planboard_common::{Board, BoardService};
use planboard_server::{build_router, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for planboard-server
#[derive(Parser, Debug)]
#[command(name = "planboard-server")]
#[command(about = "Title planning board service")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5780)
    #[arg(short, long, env = "PLANBOARD_PORT")]
    port: Option<u16>,

    /// Folder holding the board database
    #[arg(short, long, env = "PLANBOARD_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/planboard/config.toml, then /etc/planboard/config.toml)
    #[arg(short, long, env = "PLANBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Display name used until one is set through the API
    #[arg(short, long, env = "PLANBOARD_USER")]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config.logging.level);

    info!(
        "Starting planboard-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match args.config.clone().or_else(config::find_config_file) {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }

    // Root folder: CLI/env, then TOML, then platform default
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    let db_path = root_folder.join(DATABASE_FILE_NAME);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await.context("Failed to initialize database")?;
    let repo = BoardRepository::new(pool);

    let default_user = args
        .user
        .clone()
        .or_else(|| config.user.clone())
        .unwrap_or_else(|| DEFAULT_USER.to_string());

    let sync_agent = match config.sync.transport {
        SyncTransportKind::None => {
            info!("Sync disabled, running local-only");
            None
        }
        SyncTransportKind::Http => match connect_http_transport(&config, &repo, &default_user).await {
            Ok(transport) => Some(Arc::new(SyncAgent::new(transport, config.sync.interval()))),
            Err(e) => {
                // Local-only is still a working board
                error!("Sync unavailable, running local-only: {:#}", e);
                None
            }
        },
    };

    let board = Board::new(config.board, config.scoring.clone(), config.author_directory());
    log_authors(board.authors());
    let service = Arc::new(
        BoardService::open(repo, board, &default_user, sync_agent.clone())
            .await
            .context("Failed to load board")?,
    );

    let cancel = CancellationToken::new();
    let agent_task = sync_agent.map(|agent| tokio::spawn(agent.run(service.clone(), cancel.clone())));

    let app = build_router(AppState::new(service));
    let port = args.port.unwrap_or_else(|| config.port());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("planboard-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Some(task) = agent_task {
        if let Err(e) = task.await {
            warn!("Sync agent ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins; otherwise the configured level applies to our crates
fn init_tracing(level: &str) {
    let default_filter = format!(
        "planboard_server={level},planboard_common={level},tower_http={level}",
        level = level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_authors(authors: &AuthorDirectory) {
    if authors.is_empty() {
        info!("No author profiles configured");
    } else {
        info!("Loaded {} author profiles", authors.len());
    }
}

/// Open the configured bin, the remembered one, or create a new one
///
/// A newly created bin starts with the board's stored snapshot and its id is
/// remembered so the next start joins the same session.
async fn connect_http_transport(
    config: &TomlConfig,
    repo: &BoardRepository,
    user: &str,
) -> Result<Arc<dyn SyncTransport>> {
    let sync = &config.sync;
    let remembered = repo.sync_session().await?;

    if let Some(bin_id) = sync.bin_id.clone().or(remembered) {
        let transport = HttpDocumentTransport::new(&sync.base_url, &bin_id, sync.api_key.clone(), DEFAULT_TIMEOUT)?;
        repo.set_sync_session(&bin_id).await?;
        info!("Joining sync session {}", bin_id);
        return Ok(Arc::new(transport));
    }

    let (snapshot, last_update) = repo.load_snapshot().await?;
    let initial = SyncDocument {
        titles: snapshot.titles,
        plans: snapshot.plans,
        activities: snapshot.activities,
        allocation: snapshot.allocation,
        chat_history: snapshot.chat_history,
        last_update,
        updated_by: repo.current_user().await?.unwrap_or_else(|| user.to_string()),
    };
    let transport =
        HttpDocumentTransport::create_bin(&sync.base_url, sync.api_key.clone(), DEFAULT_TIMEOUT, &initial).await?;
    repo.set_sync_session(transport.bin_id()).await?;
    info!("Started new sync session {}", transport.bin_id());
    Ok(Arc::new(transport))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
