use std::fmt;

use gatehouse_server::ServerBuilder;
use gatehouse_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use gatehouse_server::observability::LogControl;

/// Why the process stopped. Start-up problems exit with 2, a server that
/// fails after binding exits with 1.
#[derive(Debug)]
enum Failure {
    Logging(anyhow::Error),
    Config(String),
    Startup(anyhow::Error),
    Serve(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Logging(_) | Self::Config(_) | Self::Startup(_) => 2,
            Self::Serve(_) => 1,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logging(e) => write!(f, "Logging setup failed: {e:#}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Startup(e) => write!(f, "Server initialization failed: {e:#}"),
            Self::Serve(e) => write!(f, "Server error: {e:#}"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        let not_found = matches!(
            e,
            dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        );
        if !not_found {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    if let Err(failure) = run().await {
        eprintln!("{failure}");
        std::process::exit(failure.exit_code());
    }
}

async fn run() -> Result<(), Failure> {
    let logs = LogControl::install("info").map_err(Failure::Logging)?;

    let config_path =
        std::env::var("GATEHOUSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = load_config(Some(&config_path)).map_err(Failure::Config)?;

    tracing::info!(path = %config_path, "Configuration loaded");
    if let Err(e) = logs.set_level(&cfg.logging.level) {
        tracing::warn!(error = %e, "keeping bootstrap log level");
    }

    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .map_err(Failure::Startup)?;

    server.run().await.map_err(Failure::Serve)
}
