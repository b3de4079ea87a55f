//! edge-echo: a single-threaded, edge-triggered echo server
//!
//! Features:
//! - One reactor thread multiplexing every connection (epoll/kqueue)
//! - Drain-to-exhaustion reads on each readiness edge
//! - Exact or zero-padded echo
//! - Configuration via CLI arguments or TOML file

use edge_echo::config::Config;
use edge_echo::runtime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        buffer_size = config.buffer_size,
        max_events = config.max_events,
        echo_mode = ?config.echo_mode,
        "Starting edge-echo server"
    );

    if let Err(e) = runtime::run(&config) {
        error!(error = %e, "Server failed");
        return Err(e.into());
    }
    Ok(())
}
