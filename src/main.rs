use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lanserve::config::{self, DEFAULT_EXPIRY_MINUTES, FileConfig, ListingOptions, ServerConfig};
use lanserve::lifecycle::{self, ShutdownTimer};
use lanserve::{AppState, network};

#[derive(Parser, Debug)]
#[command(name = "lanserve")]
#[command(about = "Share a folder on the local network with generated directory listings")]
#[command(version)]
struct Cli {
    /// Root folder to serve, defaults to the current directory
    #[arg(short, long, env = "LANSERVE_SOURCE")]
    source: Option<PathBuf>,

    /// Root folder to serve when --source is not given
    #[arg(value_name = "SOURCE")]
    folder: Option<PathBuf>,

    /// Port to listen on, defaults to a random port in 8000-8999
    #[arg(short, long, env = "LANSERVE_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "LANSERVE_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Do not open the browser
    #[arg(short, long, env = "LANSERVE_BACKGROUND")]
    background: bool,

    /// Shut down after this many minutes, 0 to keep alive
    #[arg(short, long, env = "LANSERVE_TIME", default_value_t = DEFAULT_EXPIRY_MINUTES)]
    time: u64,

    /// Keep alive, overrides --time
    #[arg(short, long, env = "LANSERVE_ALIVE")]
    alive: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "LANSERVE_CONFIG")]
    config: Option<PathBuf>,

    /// Hide the QR code on listing pages
    #[arg(long)]
    no_qrcode: bool,

    /// Disable the hover preview frame on listing pages
    #[arg(long)]
    no_preview: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "LANSERVE_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn listing_options(&self) -> Result<ListingOptions> {
        let file_config = match &self.config {
            Some(path) => FileConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => FileConfig::default(),
        };

        let mut options = ListingOptions::from_file_config(&file_config)?;
        if self.no_qrcode {
            options.show_qrcode = false;
        }
        if self.no_preview {
            options.preview = false;
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "lanserve=debug,tower_http=debug"
    } else {
        "lanserve=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listing = cli.listing_options()?;

    let root = config::resolve_root(cli.source.clone(), cli.folder.clone());
    let root_dir = root
        .canonicalize()
        .with_context(|| format!("Root directory does not exist: {}", root.display()))?;

    if !root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", root_dir.display());
    }

    let config = ServerConfig {
        root_dir,
        port: config::resolve_port(cli.port),
        open_browser: !cli.background,
        expiry: lifecycle::effective_expiry(cli.alive, cli.time),
        listing,
    };

    let addr: SocketAddr = format!("{}:{}", cli.bind, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;

    let public_url = format!("http://{}:{}/", network::display_host(), config.port);

    info!("Serving files from: {}", config.root_dir.display());
    info!("Listening on {}", addr);
    println!("{}", lifecycle::banner(&public_url, &config));

    if config.open_browser {
        lifecycle::open_browser(&public_url);
    }

    let timer = ShutdownTimer::start(config.expiry);
    let app = lanserve::app(AppState::new(config, public_url));

    axum::serve(listener, app)
        .with_graceful_shutdown(lifecycle::shutdown_signal(timer.expired()))
        .await
        .context("running server")?;

    info!("Server stopped");
    Ok(())
}
