//! line-relay binary
//!
//! Run with: line-relay [--feed PATH] [--port PORT]
//!
//! Examples:
//!   mkfifo nmea_fifo && line-relay                 # reads ./nmea_fifo, serves 0.0.0.0:10000
//!   line-relay --feed /tmp/ais.log --port 2000     # replays a file to subscribers
//!   nc localhost 10000                             # subscribe

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use line_relay::logging::{self, LogFormat};
use line_relay::server::{DEFAULT_BACKLOG, DEFAULT_PORT, EXIT_SETUP_FAILURE};
use line_relay::{feed, OverflowPolicy, RegistryConfig, RelayServer, ServerConfig};

/// Relay every line of a feed to all connected TCP subscribers
#[derive(Debug, Parser)]
#[command(name = "line-relay", version, about)]
struct Cli {
    /// Feed to read lines from (named pipe or file)
    #[arg(short, long, env = "LINE_RELAY_FEED", default_value = feed::DEFAULT_FEED_PATH)]
    feed: PathBuf,

    /// Interface to listen on
    #[arg(long, env = "LINE_RELAY_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Subscriber port
    #[arg(short, long, env = "LINE_RELAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,

    /// Maximum concurrent subscribers (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_subscribers: usize,

    /// Maximum queued messages per subscriber (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    max_queue_depth: usize,

    /// What to do when a subscriber queue is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::DropOldest)]
    overflow_policy: OverflowPolicy,

    /// Leave Nagle's algorithm enabled on subscriber sockets
    #[arg(long)]
    no_tcp_nodelay: bool,

    /// Milliseconds subscribers get to flush queued lines once the feed ends
    #[arg(long, default_value_t = 1000)]
    shutdown_grace_ms: u64,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "LINE_RELAY_LOG", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level, cli.log_format) {
        eprintln!("{e}");
        return ExitCode::from(EXIT_SETUP_FAILURE);
    }

    let config = ServerConfig::with_addr(SocketAddr::new(cli.host, cli.port))
        .backlog(cli.backlog)
        .max_subscribers(cli.max_subscribers)
        .tcp_nodelay(!cli.no_tcp_nodelay)
        .shutdown_grace(Duration::from_millis(cli.shutdown_grace_ms));
    let registry_config = RegistryConfig::default()
        .max_queue_depth(cli.max_queue_depth)
        .overflow_policy(cli.overflow_policy);

    let server = match RelayServer::bind_with_registry_config(config, registry_config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Relay setup failed");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    let feed = match feed::open(&cli.feed).await {
        Ok(feed) => feed,
        Err(e) => {
            tracing::error!(error = %e, "Relay setup failed");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let termination = server.run_until(feed, shutdown).await;
    ExitCode::from(termination.exit_code())
}
