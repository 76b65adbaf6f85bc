//! Subscriber connection handling
//!
//! One session task per subscriber. The task owns the socket: it watches the
//! read half for anything at all (disconnect signal) and writes queued
//! messages to the write half. It only waits for writability while it has a
//! message in hand; with an empty queue it parks until the next broadcast.

use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::registry::SubscriberHandle;
use crate::stats::SessionStats;

use super::state::{DisconnectReason, SessionOutcome};

/// Default size of the buffer used to detect inbound bytes
pub const DEFAULT_PROBE_SIZE: usize = 512;

/// Serves one subscriber until it disconnects or the relay closes its queue
pub struct SubscriberSession {
    handle: SubscriberHandle,
    stream: TcpStream,
    probe_size: usize,
}

impl SubscriberSession {
    /// Create a session for an accepted connection
    pub fn new(handle: SubscriberHandle, stream: TcpStream) -> Self {
        Self {
            handle,
            stream,
            probe_size: DEFAULT_PROBE_SIZE,
        }
    }

    /// Set the size of the inbound probe buffer
    pub fn probe_size(mut self, size: usize) -> Self {
        self.probe_size = size.max(1);
        self
    }

    /// Run the session to completion
    ///
    /// Every message is written in full before the next one is taken from
    /// the queue. The socket is closed when this returns.
    pub async fn run(self) -> SessionOutcome {
        let started = Instant::now();
        let SubscriberHandle {
            id,
            peer_addr,
            queue,
        } = self.handle;

        let (mut reader, mut writer) = self.stream.into_split();
        let mut probe = vec![0u8; self.probe_size];
        let mut stats = SessionStats::new();

        let reason = loop {
            tokio::select! {
                read = reader.read(&mut probe) => break DisconnectReason::from_read(read),
                next = queue.next_outbound() => {
                    let Some(message) = next else {
                        break DisconnectReason::Closed;
                    };

                    // Keep watching for disconnect while a slow peer drains the write
                    tokio::select! {
                        written = writer.write_all(message.as_bytes()) => {
                            if let Err(e) = written {
                                break DisconnectReason::WriteFailed(e.kind());
                            }
                            stats.record_sent(&message);
                            tracing::trace!(subscriber = %id, seq = message.seq, "Message sent");
                        }
                        read = reader.read(&mut probe) => break DisconnectReason::from_read(read),
                    }
                }
            }
        };

        if reason == DisconnectReason::Closed {
            let _ = writer.shutdown().await;
        }

        // Nothing more will be read from this queue
        queue.discard();
        stats.duration = started.elapsed();

        tracing::debug!(
            subscriber = %id,
            peer = %peer_addr,
            reason = %reason,
            messages_sent = stats.messages_sent,
            bytes_sent = stats.bytes_sent,
            "Session ended"
        );

        SessionOutcome {
            id,
            peer_addr,
            reason,
            stats,
        }
    }
}
