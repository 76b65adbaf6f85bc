//! Subscriber entry types
//!
//! This module defines the per-subscriber state stored in the registry.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::AbortHandle;

use super::queue::OutboundQueue;

/// Unique identifier of a subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entry for a single subscriber in the registry
pub struct SubscriberEntry {
    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Messages waiting to be written
    pub(super) queue: Arc<OutboundQueue>,

    /// Session task owning the connection, once spawned
    pub(super) task: Option<AbortHandle>,
}

impl SubscriberEntry {
    pub(super) fn new(peer_addr: SocketAddr, queue: OutboundQueue) -> Self {
        Self {
            peer_addr,
            queue: Arc::new(queue),
            task: None,
        }
    }

    /// Discard the queue and close the connection
    ///
    /// Returns how many queued messages were discarded.
    pub(super) fn evict(self) -> usize {
        let discarded = self.queue.discard();
        if let Some(task) = self.task {
            // Aborting drops the session future and with it the socket
            task.abort();
        }
        discarded
    }
}

/// What a session task needs to serve one subscriber
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    /// Subscriber identity
    pub id: SubscriberId,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// Queue shared with the registry
    pub queue: Arc<OutboundQueue>,
}
