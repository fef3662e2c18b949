//! path-proxy binary.
//!
//! ```text
//! HOST=proxy.example.com ENV=production path-proxy --config proxy.toml
//! ```

use std::path::PathBuf;

use clap::Parser;

use path_proxy::config::{apply_env_overrides, read_config, validate_config, ConfigError};
use path_proxy::lifecycle::{self, signals, Shutdown};
use path_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "path-proxy")]
#[command(about = "Path-addressed forward/reverse HTTP proxy", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(cli.config.as_deref())?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_filter);
    tracing::info!("path-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        host = %config.proxy.host,
        environment = ?config.proxy.environment,
        tls = config.listener.tls.is_some(),
        response_timeout_secs = config.timeouts.response_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    lifecycle::start(config, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
