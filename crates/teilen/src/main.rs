use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use teilen::config::{AppConfig, Mode};
use teilen::{AppState, banner, routes};

/// Command line flags. Environment overrides (`TEILEN_*`) are read by
/// [`AppConfig::load`] only; flags given here win over both.
#[derive(Parser, Debug)]
#[command(name = "teilen")]
#[command(about = "Share a local directory over HTTP")]
#[command(version)]
struct Cli {
    /// Directory to share
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,

    /// Shared secret clients must send in the X-Teilen-Auth header
    #[arg(long)]
    password: Option<String>,

    /// Runtime mode (prod or dev)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<Mode>,

    /// Directory with the web UI build
    #[arg(long)]
    static_path: Option<PathBuf>,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

fn parse_mode(value: &str) -> Result<Mode, String> {
    match value.to_ascii_lowercase().as_str() {
        "prod" => Ok(Mode::Prod),
        "dev" => Ok(Mode::Dev),
        other => Err(format!("unknown mode '{other}', expected 'prod' or 'dev'")),
    }
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(working_dir) = self.working_dir {
            config.working_dir = working_dir;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(static_path) = self.static_path {
            config.static_path = Some(static_path);
        }
        config
    }
}

fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("teilen={level},tower_http={level}")));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .ok();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let print_config = cli.print_config;
    let file_config = AppConfig::load(cli.config.as_deref())?;
    let config = cli.apply(file_config);

    if print_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    if config.mode != Mode::Prod {
        warn!("Running in unexpected mode '{}', not intended for production", config.mode);
    }

    let state = AppState::from_config(config.clone()).with_context(|| {
        format!(
            "opening working directory {}",
            config.working_dir.display()
        )
    })?;

    info!("Serving files from: {}", state.root().display());
    if state.password.is_some() {
        info!("Password protection enabled");
    }
    if let Some(static_path) = &config.static_path {
        info!("Serving web UI from: {}", static_path.display());
    }

    print!("{}", banner::render(&config, &banner::address_options()));

    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("parsing bind address {}:{}", config.bind, config.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Starting teilen on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}
