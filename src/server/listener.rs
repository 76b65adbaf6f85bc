//! Relay control loop
//!
//! A single task multiplexes readiness across the feed, the listening socket
//! and the set of subscriber sessions. Subscribers are served by their own
//! session tasks, but the registry is only ever touched from this loop.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::task::{self, AbortHandle, JoinError, JoinSet};
use tokio::time::{Instant, Sleep};

use crate::error::{Error, Result};
use crate::feed::{FeedReader, Message};
use crate::registry::{RegistryConfig, SubscriberId, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::termination::Termination;
use crate::session::{SessionOutcome, SubscriberSession};
use crate::stats::RelayStats;

/// How long accepting pauses after a failed `accept` (e.g. EMFILE)
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Broadcast relay server
pub struct RelayServer {
    config: ServerConfig,
    listener: TcpListener,
    registry: SubscriberRegistry,
    sessions: JoinSet<SessionOutcome>,
    /// Subscriber served by each running session task
    session_ids: HashMap<task::Id, SubscriberId>,
    stats: RelayStats,
    stats_tx: watch::Sender<RelayStats>,
    started_at: Instant,
}

impl RelayServer {
    /// Bind the listening socket with unbounded subscriber queues
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_registry_config(config, RegistryConfig::default()).await
    }

    /// Bind the listening socket with custom registry configuration
    pub async fn bind_with_registry_config(
        config: ServerConfig,
        registry_config: RegistryConfig,
    ) -> Result<Self> {
        let listener = listen(&config).map_err(|source| Error::Bind {
            addr: config.bind_addr,
            source,
        })?;

        tracing::info!(
            addr = %listener.local_addr()?,
            backlog = config.backlog,
            max_queue_depth = registry_config.max_queue_depth,
            "Relay listening"
        );

        let (stats_tx, _) = watch::channel(RelayStats::new());

        Ok(Self {
            config,
            listener,
            registry: SubscriberRegistry::with_config(registry_config),
            sessions: JoinSet::new(),
            session_ids: HashMap::new(),
            stats: RelayStats::new(),
            stats_tx,
            started_at: Instant::now(),
        })
    }

    /// Get the bound address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Watch relay statistics; updated on every loop event
    pub fn stats(&self) -> watch::Receiver<RelayStats> {
        self.stats_tx.subscribe()
    }

    /// Run the relay until the feed ends
    pub async fn run<R>(self, feed: FeedReader<R>) -> Termination
    where
        R: AsyncRead + Unpin,
    {
        self.run_until(feed, std::future::pending()).await
    }

    /// Run the relay until the feed ends or `shutdown` completes
    pub async fn run_until<R, F>(mut self, mut feed: FeedReader<R>, shutdown: F) -> Termination
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut backoff = AcceptBackoff::new();

        let termination = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break Termination::Interrupted;
                }
                read = feed.read_message() => match read {
                    Ok(Some(message)) => self.dispatch(message),
                    Ok(None) => {
                        tracing::info!(
                            messages = feed.messages_read(),
                            "Feed closed, no producer left"
                        );
                        break Termination::EndOfStream;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Feed read failed");
                        break Termination::FeedFault(e);
                    }
                },
                accepted = self.listener.accept(), if !backoff.is_paused() => match accepted {
                    Ok((socket, peer_addr)) => self.admit(socket, peer_addr),
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            backoff_ms = ACCEPT_BACKOFF.as_millis() as u64,
                            "Failed to accept connection"
                        );
                        backoff.pause();
                    }
                },
                _ = backoff.wait(), if backoff.is_paused() => {}
                Some(joined) = self.sessions.join_next_with_id(), if !self.sessions.is_empty() => {
                    self.reap(joined);
                }
            }
        };

        self.drain().await;

        tracing::info!(
            reason = %termination,
            messages_read = self.stats.messages_read,
            messages_discarded = self.stats.messages_discarded,
            messages_dropped = self.stats.messages_dropped,
            subscribers_accepted = self.stats.subscribers_accepted,
            subscribers_rejected = self.stats.subscribers_rejected,
            subscribers_evicted = self.stats.subscribers_evicted,
            uptime_secs = self.stats.uptime.as_secs(),
            "Relay stopped"
        );

        termination
    }

    /// Fan a feed message out to every subscriber queue
    fn dispatch(&mut self, message: Message) {
        let report = self.registry.broadcast(&message);

        if report.reached_nobody() {
            tracing::debug!(seq = message.seq, "Discarding message, no subscribers");
        } else {
            tracing::trace!(
                seq = message.seq,
                bytes = message.len(),
                subscribers = report.delivered,
                "Message broadcast"
            );
        }

        self.stats.record_broadcast(&message, &report);
        self.publish_stats();
    }

    /// Register an accepted connection and spawn its session
    fn admit(&mut self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.max_subscribers > 0 && self.registry.len() >= self.config.max_subscribers {
            tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
            self.stats.subscribers_rejected += 1;
            self.publish_stats();
            return;
        }

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        let handle = self.registry.add(peer_addr);
        let id = handle.id;
        let session = SubscriberSession::new(handle, socket).probe_size(self.config.read_probe_size);
        let task = self.sessions.spawn(session.run());
        self.track(id, task);

        self.stats.subscribers_accepted += 1;
        self.publish_stats();
    }

    fn track(&mut self, id: SubscriberId, task: AbortHandle) {
        self.session_ids.insert(task.id(), id);
        self.registry.attach(id, task);
    }

    /// Handle a finished session task
    fn reap(&mut self, joined: std::result::Result<(task::Id, SessionOutcome), JoinError>) {
        match joined {
            Ok((task_id, outcome)) => {
                self.session_ids.remove(&task_id);
                if self.registry.remove(outcome.id) {
                    self.stats.subscribers_evicted += 1;
                }

                if outcome.reason.is_failure() {
                    tracing::warn!(
                        subscriber = %outcome.id,
                        peer = %outcome.peer_addr,
                        reason = %outcome.reason,
                        messages_sent = outcome.stats.messages_sent,
                        "Subscriber connection failed"
                    );
                } else {
                    tracing::info!(
                        subscriber = %outcome.id,
                        peer = %outcome.peer_addr,
                        reason = %outcome.reason,
                        messages_sent = outcome.stats.messages_sent,
                        bytes_per_sec = outcome.stats.throughput(),
                        "Subscriber disconnected"
                    );
                }
            }
            Err(e) => {
                // Cancelled tasks were aborted by the registry, which already removed them
                if let Some(id) = self.session_ids.remove(&e.id()) {
                    if self.registry.remove(id) {
                        self.stats.subscribers_evicted += 1;
                    }
                    if e.is_panic() {
                        tracing::error!(subscriber = %id, error = %e, "Subscriber session panicked");
                    }
                }
            }
        }

        self.publish_stats();
    }

    /// Stop every session, giving them the grace period to flush their queues
    async fn drain(&mut self) {
        let closing = self.registry.close_all();
        if closing > 0 {
            tracing::info!(
                subscribers = closing,
                grace_ms = self.config.shutdown_grace.as_millis() as u64,
                "Flushing subscriber queues"
            );
        }

        let sessions = &mut self.sessions;
        let flushed = tokio::time::timeout(self.config.shutdown_grace, async {
            while let Some(joined) = sessions.join_next().await {
                if let Ok(outcome) = joined {
                    tracing::debug!(
                        subscriber = %outcome.id,
                        messages_sent = outcome.stats.messages_sent,
                        "Session flushed"
                    );
                }
            }
        })
        .await;

        if flushed.is_err() {
            tracing::warn!(
                remaining = self.sessions.len(),
                "Shutdown grace period elapsed, closing remaining subscribers"
            );
            self.sessions.shutdown().await;
        }
        self.session_ids.clear();

        self.publish_stats();
    }

    fn publish_stats(&mut self) {
        self.stats.active_subscribers = self.registry.len() as u64;
        self.stats.uptime = self.started_at.elapsed();
        self.stats_tx.send_replace(self.stats.clone());
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

/// Pauses accepting for [`ACCEPT_BACKOFF`] so a persistent accept error
/// does not spin the control loop
struct AcceptBackoff {
    delay: Pin<Box<Sleep>>,
    paused: bool,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            delay: Box::pin(tokio::time::sleep(Duration::ZERO)),
            paused: false,
        }
    }

    fn pause(&mut self) {
        self.delay.as_mut().reset(Instant::now() + ACCEPT_BACKOFF);
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    /// Complete once the pause has elapsed
    async fn wait(&mut self) {
        self.delay.as_mut().await;
        self.paused = false;
    }
}

/// Create the listening socket with the configured backlog
fn listen(config: &ServerConfig) -> io::Result<TcpListener> {
    let socket = if config.bind_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    #[cfg(unix)]
    socket.set_reuseaddr(true)?;

    socket.bind(config.bind_addr)?;
    socket.listen(config.backlog)
}
