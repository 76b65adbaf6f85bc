//! Per-subscriber outbound queue
//!
//! The control loop pushes, the subscriber's session task pops. The session
//! only waits for writability while the queue holds something: when it is
//! empty the session parks on a `Notify` until the next push or close.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::feed::Message;

use super::config::{OverflowPolicy, RegistryConfig};

/// Result of pushing onto a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Message queued
    Queued,
    /// Message queued after discarding the oldest queued message
    DroppedOldest,
    /// Queue full, the incoming message was discarded
    DroppedNewest,
    /// Queue full and the policy is to disconnect; nothing was queued
    Overflow,
    /// Queue closed; nothing was queued
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<Message>,
    closed: bool,
}

/// FIFO of messages waiting to be written to one subscriber
#[derive(Debug)]
pub struct OutboundQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    max_depth: usize,
    policy: OverflowPolicy,
}

impl OutboundQueue {
    /// Create an unbounded queue
    pub fn unbounded() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Create a queue bounded according to `config`
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            max_depth: config.max_queue_depth,
            policy: config.overflow_policy,
        }
    }

    /// Append a message
    pub fn push(&self, message: Message) -> PushOutcome {
        let outcome = {
            let mut state = self.state.lock();

            if state.closed {
                return PushOutcome::Closed;
            }

            if self.max_depth > 0 && state.messages.len() >= self.max_depth {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        state.messages.pop_front();
                        state.messages.push_back(message);
                        PushOutcome::DroppedOldest
                    }
                    OverflowPolicy::DropNewest => return PushOutcome::DroppedNewest,
                    OverflowPolicy::Disconnect => return PushOutcome::Overflow,
                }
            } else {
                state.messages.push_back(message);
                PushOutcome::Queued
            }
        };

        // Single consumer: a stored permit wakes it even if it is not parked yet
        self.notify.notify_one();
        outcome
    }

    /// Pop the head of the queue without waiting
    pub fn pop(&self) -> Option<Message> {
        self.state.lock().messages.pop_front()
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the queue is closed and everything queued before
    /// the close has been handed out.
    pub async fn next_outbound(&self) -> Option<Message> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(message) = state.messages.pop_front() {
                    return Some(message);
                }
                if state.closed {
                    return None;
                }
            }

            self.notify.notified().await;
        }
    }

    /// Stop accepting messages; already queued messages can still be drained
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    /// Close the queue and discard everything still queued
    ///
    /// Returns how many messages were discarded.
    pub fn discard(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.closed = true;
            let count = state.messages.len();
            state.messages.clear();
            count
        };
        self.notify.notify_one();
        discarded
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
