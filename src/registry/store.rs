//! Subscriber registry implementation
//!
//! The registry owns every live subscriber and its outbound queue. It is
//! owned by the relay's control loop and only mutated from there, so it needs
//! no locking of its own; only the queues are shared with session tasks.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::task::AbortHandle;

use crate::feed::Message;

use super::config::RegistryConfig;
use super::entry::{SubscriberEntry, SubscriberHandle, SubscriberId};
use super::queue::{OutboundQueue, PushOutcome};

/// Summary of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the message was queued for
    pub delivered: usize,
    /// Messages lost to the queue depth limit
    pub dropped: usize,
    /// Subscribers evicted because their queue overflowed
    pub evicted: Vec<SubscriberId>,
}

impl BroadcastReport {
    /// Whether the message found no subscriber at all
    pub fn reached_nobody(&self) -> bool {
        self.delivered == 0 && self.dropped == 0 && self.evicted.is_empty()
    }
}

/// Registry of connected subscribers
pub struct SubscriberRegistry {
    subscribers: HashMap<SubscriberId, SubscriberEntry>,
    next_id: u64,
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a registry with unbounded queues
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 1,
            config,
        }
    }

    /// Register a new subscriber with an empty queue
    pub fn add(&mut self, peer_addr: SocketAddr) -> SubscriberHandle {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let entry = SubscriberEntry::new(peer_addr, OutboundQueue::with_config(&self.config));
        let handle = SubscriberHandle {
            id,
            peer_addr,
            queue: entry.queue.clone(),
        };
        self.subscribers.insert(id, entry);

        tracing::info!(
            subscriber = %id,
            peer = %peer_addr,
            subscribers = self.subscribers.len(),
            "Subscriber added"
        );

        handle
    }

    /// Attach the session task serving `id`
    ///
    /// If the subscriber is already gone the task is aborted immediately and
    /// `false` is returned.
    pub fn attach(&mut self, id: SubscriberId, task: AbortHandle) -> bool {
        match self.subscribers.get_mut(&id) {
            Some(entry) => {
                entry.task = Some(task);
                true
            }
            None => {
                task.abort();
                false
            }
        }
    }

    /// Remove a subscriber, discarding its queue and closing its connection
    ///
    /// Removing an unknown or already removed subscriber is a no-op and
    /// returns `false`.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let Some(entry) = self.subscribers.remove(&id) else {
            return false;
        };

        let peer_addr = entry.peer_addr;
        let discarded = entry.evict();

        tracing::debug!(
            subscriber = %id,
            peer = %peer_addr,
            discarded = discarded,
            subscribers = self.subscribers.len(),
            "Subscriber removed"
        );

        true
    }

    /// Queue a message for every live subscriber
    ///
    /// Subscribers whose queue overflows under
    /// [`OverflowPolicy::Disconnect`](super::OverflowPolicy::Disconnect) are
    /// evicted before this returns.
    pub fn broadcast(&mut self, message: &Message) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, entry) in &self.subscribers {
            match entry.queue.push(message.clone()) {
                PushOutcome::Queued => report.delivered += 1,
                outcome @ (PushOutcome::DroppedOldest | PushOutcome::DroppedNewest) => {
                    if outcome == PushOutcome::DroppedOldest {
                        report.delivered += 1;
                    }
                    report.dropped += 1;
                    tracing::warn!(
                        subscriber = %id,
                        seq = message.seq,
                        policy = ?self.config.overflow_policy,
                        "Subscriber queue full, message dropped"
                    );
                }
                PushOutcome::Overflow => report.evicted.push(*id),
                // Session already ended; the loop removes it when it reaps the task
                PushOutcome::Closed => {}
            }
        }

        for id in &report.evicted {
            tracing::warn!(
                subscriber = %id,
                max_queue_depth = self.config.max_queue_depth,
                "Subscriber queue overflowed, disconnecting"
            );
            self.remove(*id);
        }

        report
    }

    /// Pop the next message queued for `id`
    pub fn next_outbound(&self, id: SubscriberId) -> Option<Message> {
        self.subscribers.get(&id).and_then(|entry| entry.queue.pop())
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscriber is connected
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Close every queue for new messages and forget all subscribers
    ///
    /// Unlike [`remove`](Self::remove), queued messages are kept so session
    /// tasks can still flush them. Returns how many subscribers were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.subscribers.len();
        for (_, entry) in self.subscribers.drain() {
            entry.queue.close();
        }
        count
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use super::super::config::OverflowPolicy;
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn drain(registry: &SubscriberRegistry, id: SubscriberId) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(message) = registry.next_outbound(id) {
            out.extend_from_slice(message.as_bytes());
        }
        out
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut registry = SubscriberRegistry::new();

        let a = registry.add(peer(5001));
        let b = registry.add(peer(5002));

        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
        assert!(a.queue.is_empty());
        assert!(registry.next_outbound(a.id).is_none());
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber_in_order() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        let b = registry.add(peer(5002));

        for (seq, line) in [(1, "A\n"), (2, "B\n"), (3, "C\n")] {
            let report = registry.broadcast(&Message::new(seq, line));
            assert_eq!(report.delivered, 2);
        }

        assert_eq!(drain(&registry, a.id), b"A\nB\nC\n");
        assert_eq!(drain(&registry, b.id), b"A\nB\nC\n");
    }

    #[test]
    fn test_late_joiner_gets_no_backfill() {
        let mut registry = SubscriberRegistry::new();
        let early = registry.add(peer(5001));

        registry.broadcast(&Message::new(1, "A\n"));
        let late = registry.add(peer(5002));
        registry.broadcast(&Message::new(2, "B\n"));
        registry.broadcast(&Message::new(3, "C\n"));

        assert_eq!(drain(&registry, early.id), b"A\nB\nC\n");
        assert_eq!(drain(&registry, late.id), b"B\nC\n");
    }

    #[test]
    fn test_broadcast_with_no_subscribers() {
        let mut registry = SubscriberRegistry::new();
        let report = registry.broadcast(&Message::new(1, "A\n"));

        assert_eq!(report, BroadcastReport::default());
        assert!(report.reached_nobody());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));

        assert!(registry.remove(a.id));
        assert!(!registry.remove(a.id));
        assert!(!registry.remove(SubscriberId(999)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_discards_queued_messages_only_for_that_subscriber() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        let b = registry.add(peer(5002));

        registry.broadcast(&Message::new(1, "A\n"));
        registry.broadcast(&Message::new(2, "B\n"));

        assert!(registry.remove(a.id));
        assert!(a.queue.is_empty());
        assert!(a.queue.is_closed());
        assert!(registry.next_outbound(a.id).is_none());

        registry.broadcast(&Message::new(3, "C\n"));
        assert_eq!(drain(&registry, b.id), b"A\nB\nC\n");
    }

    #[test]
    fn test_messages_share_one_allocation() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        let b = registry.add(peer(5002));

        registry.broadcast(&Message::new(1, "shared\n"));

        let from_a = registry.next_outbound(a.id).unwrap();
        let from_b = registry.next_outbound(b.id).unwrap();
        assert_eq!(from_a.as_bytes().as_ptr(), from_b.as_bytes().as_ptr());
    }

    #[test]
    fn test_overflow_disconnect_evicts_only_slow_subscriber() {
        let config = RegistryConfig::default()
            .max_queue_depth(2)
            .overflow_policy(OverflowPolicy::Disconnect);
        let mut registry = SubscriberRegistry::with_config(config);
        let slow = registry.add(peer(5001));
        let fast = registry.add(peer(5002));

        registry.broadcast(&Message::new(1, "A\n"));
        registry.broadcast(&Message::new(2, "B\n"));
        // Fast subscriber keeps up
        assert_eq!(drain(&registry, fast.id), b"A\nB\n");

        let report = registry.broadcast(&Message::new(3, "C\n"));

        assert_eq!(report.evicted, vec![slow.id]);
        assert_eq!(report.delivered, 1);
        assert_eq!(registry.len(), 1);
        assert!(slow.queue.is_closed());
        assert_eq!(drain(&registry, fast.id), b"C\n");
    }

    #[test]
    fn test_overflow_drop_oldest_counts_drop() {
        let config = RegistryConfig::default().max_queue_depth(1);
        let mut registry = SubscriberRegistry::with_config(config);
        let a = registry.add(peer(5001));

        registry.broadcast(&Message::new(1, "A\n"));
        let report = registry.broadcast(&Message::new(2, "B\n"));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(drain(&registry, a.id), b"B\n");
    }

    #[test]
    fn test_closed_queue_is_skipped() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        let b = registry.add(peer(5002));

        // Session for `a` ended on its own but has not been reaped yet
        a.queue.close();

        let report = registry.broadcast(&Message::new(1, "A\n"));
        assert_eq!(report.delivered, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(drain(&registry, b.id), b"A\n");
    }

    #[test]
    fn test_close_all_keeps_queued_messages() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        let queue = Arc::clone(&a.queue);

        registry.broadcast(&Message::new(1, "A\n"));
        assert_eq!(registry.close_all(), 1);

        assert!(registry.is_empty());
        assert!(queue.is_closed());
        assert_eq!(queue.pop().unwrap().seq, 1);
    }

    #[tokio::test]
    async fn test_attach_after_remove_aborts_task() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));
        registry.remove(a.id);

        let task = tokio::spawn(std::future::pending::<()>());
        assert!(!registry.attach(a.id, task.abort_handle()));

        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_remove_aborts_attached_task() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add(peer(5001));

        let task = tokio::spawn(std::future::pending::<()>());
        assert!(registry.attach(a.id, task.abort_handle()));
        registry.remove(a.id);

        assert!(task.await.unwrap_err().is_cancelled());
    }
}
