//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::session::DEFAULT_PROBE_SIZE;

/// Default subscriber port
pub const DEFAULT_PORT: u16 = 10000;

/// Default listen backlog
pub const DEFAULT_BACKLOG: u32 = 5;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Pending connection queue length passed to `listen`
    pub backlog: u32,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Buffer size used to detect inbound bytes from a subscriber
    pub read_probe_size: usize,

    /// How long sessions may keep flushing queued messages once the feed ends
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            backlog: DEFAULT_BACKLOG,
            max_subscribers: 0, // Unlimited
            tcp_nodelay: true,  // Lines are small and latency sensitive
            read_probe_size: DEFAULT_PROBE_SIZE,
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Enable or disable TCP_NODELAY on subscriber sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the shutdown flush grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.backlog, 5);
        assert_eq!(config.max_subscribers, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.read_probe_size, DEFAULT_PROBE_SIZE);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:10001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 10001);
    }

    #[test]
    fn test_builder_backlog_minimum() {
        let config = ServerConfig::default().backlog(0);

        assert_eq!(config.backlog, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:2000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .backlog(64)
            .max_subscribers(10)
            .tcp_nodelay(false)
            .shutdown_grace(Duration::from_millis(250));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.backlog, 64);
        assert_eq!(config.max_subscribers, 10);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.shutdown_grace, Duration::from_millis(250));
    }
}
