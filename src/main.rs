//! quillgate CLI - writing-assist gateway server.

use clap::{Parser, Subcommand};
use quillgate::api::{create_router_with_state, open_store, AppState};
use quillgate::config::{Config, LogVerbosity};
use quillgate::quota::QuotaTracker;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quillgate")]
#[command(about = "Quota-limited writing-assist gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Log verbosity level
        #[arg(short, long, value_enum)]
        log_level: Option<LogLevel>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Show quota usage for a client
    Quota {
        /// Client identifier
        #[arg(long)]
        client: String,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Minimal,
    Compact,
    Verbose,
}

impl From<LogLevel> for LogVerbosity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Minimal => LogVerbosity::Minimal,
            LogLevel::Compact => LogVerbosity::Compact,
            LogLevel::Verbose => LogVerbosity::Verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, log_level, config }) => {
            run_server(port, log_level, config).await?;
        }
        Some(Commands::Config { path }) => {
            show_config(path)?;
        }
        Some(Commands::Quota { client, config }) => {
            show_quota(&client, config)?;
        }
        None => {
            // Default: run server
            run_server(None, None, None).await?;
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config.with_env_overrides())
}

async fn run_server(
    port_override: Option<u16>,
    log_level: Option<LogLevel>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut config = load_config(config_path)?;
    if let Some(level) = log_level {
        config.app.log_verbosity = level.into();
    }

    let port = port_override.unwrap_or(config.gateway.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    if config.api_keys.gemini.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; suggestion requests will fail with 500");
    }

    let state = AppState::from_config(&config)?;
    let app = create_router_with_state(state);

    match config.app.log_verbosity {
        LogVerbosity::Minimal => {
            println!("quillgate:{}", port);
        }
        LogVerbosity::Compact => {
            println!("→ quillgate starting on http://{}", addr);
            println!("→ Suggest API: http://{}/api/suggest", addr);
        }
        LogVerbosity::Verbose => {
            println!("────────────────────────────────────────");
            println!("quillgate v{}", env!("CARGO_PKG_VERSION"));
            println!("────────────────────────────────────────");
            println!("Gateway:    http://{}", addr);
            println!("Suggest:    http://{}/api/suggest", addr);
            println!("Assist:     http://{}/api/assist/<client>", addr);
            println!("Health:     http://{}/health", addr);
            println!("────────────────────────────────────────");
            println!("Model:      {}", config.upstream.model);
            println!("Quota:      {} / {}h ({:?})", config.quota.daily_limit, config.quota.window_hours, config.quota.store);
            println!("────────────────────────────────────────");
        }
    }

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\nGateway stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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

fn show_config(show_path: bool) -> anyhow::Result<()> {
    if show_path {
        println!("{}", Config::default_path().display());
        return Ok(());
    }

    let mut config = Config::load()?.with_env_overrides();
    if config.api_keys.gemini.is_some() {
        config.api_keys.gemini = Some("********".to_string());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn show_quota(client_id: &str, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tracker = QuotaTracker::with_window(open_store(&config)?, config.quota_window());
    let status = tracker.get_status(client_id, config.quota.daily_limit);

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
