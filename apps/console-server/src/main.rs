#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod cors;
mod logging;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use backend_sdk::Backend;
use clap::{Parser, Subcommand};
use marketplace_admin::{AccessApi, MarketplaceAdminModule};
use memory_backend_plugin::MemoryBackend;
use mimalloc::MiMalloc;
use rest_backend_plugin::RestBackend;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, BackendConfig, BackendKind, CliOverrides};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Marketplace admin console server
#[derive(Parser)]
#[command(name = "console-server")]
#[command(about = "Marketplace admin console server")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory backend instead of the hosted one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
    /// Sign in as a principal and print its profile and partner scope
    Whoami {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        port: cli.port,
        verbose: cli.verbose,
        mock: cli.mock,
    });

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init_logging(&config.logging)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
        Commands::Whoami { email, password } => whoami(config, &email, &password).await,
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    build_backend(&config.backend)?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn build_backend(cfg: &BackendConfig) -> Result<Backend> {
    match cfg.kind {
        BackendKind::Rest => {
            if cfg.rest.anon_key.is_empty() {
                anyhow::bail!(
                    "backend.rest.anon_key is not set (use CONSOLE__BACKEND__REST__ANON_KEY)"
                );
            }
            let client = RestBackend::new(&cfg.rest).context("failed to build REST backend")?;
            tracing::info!(url = %cfg.rest.url, "using hosted backend");
            Ok(Backend::from_client(Arc::new(client)))
        }
        BackendKind::Memory => {
            tracing::warn!("using in-memory backend; data is lost on exit");
            Ok(Backend::from_client(Arc::new(MemoryBackend::from_config(
                &cfg.memory,
            ))))
        }
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("console server starting");
    let AppConfig {
        server,
        backend,
        console,
        ..
    } = config;

    let backend = build_backend(&backend)?;
    let module = MarketplaceAdminModule::new(backend, console);

    let mut router = module
        .router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http());
    if server.cors.enabled {
        router = router.layer(cors::build_cors_layer(&server.cors));
    }

    let cancel = CancellationToken::new();
    let watcher = module.spawn_auth_watcher(cancel.child_token());

    let listener = tokio::net::TcpListener::bind(server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server.bind_addr))?;
    tracing::info!(addr = %server.bind_addr, "HTTP server bound");

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                res = signals::wait_for_shutdown() => {
                    if let Err(e) = res {
                        tracing::error!(error = %e, "signal handling failed");
                    }
                    cancel.cancel();
                }
            }
            tracing::info!("HTTP server shutting down gracefully");
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    cancel.cancel();
    if let Err(e) = watcher.await {
        tracing::warn!(error = %e, "auth watcher ended abnormally");
    }
    served.context("HTTP server failed")
}

async fn whoami(config: AppConfig, email: &str, password: &str) -> Result<()> {
    let backend = build_backend(&config.backend)?;
    let module = MarketplaceAdminModule::new(backend, config.console);
    let store = module.session_store();

    let ctx = store
        .sign_in(email, password)
        .await
        .with_context(|| format!("sign-in as {email} failed"))?;
    let partner_ids = module.access().partner_ids(&ctx).await;
    let summary = serde_json::json!({
        "principal": ctx.principal(),
        "profile": ctx.profile(),
        "partner_ids": partner_ids,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    store.sign_out().await.context("sign-out failed")?;
    Ok(())
}
