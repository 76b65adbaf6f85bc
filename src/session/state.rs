//! Session end states
//!
//! A subscriber session ends for exactly one reason. None of them is an
//! error for the relay as a whole: the control loop just removes the
//! subscriber.

use std::io;
use std::net::SocketAddr;

use crate::registry::SubscriberId;
use crate::stats::SessionStats;

/// Why a subscriber session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer closed its end of the connection
    PeerClosed,
    /// Peer sent data; the stream is one-directional so this means "go away"
    UnexpectedInput(usize),
    /// Reading from the peer failed
    ReadFailed(io::ErrorKind),
    /// Writing to the peer failed
    WriteFailed(io::ErrorKind),
    /// The relay closed the queue (shutdown) and everything queued was sent
    Closed,
}

impl DisconnectReason {
    /// Map the result of a read on the subscriber socket
    pub fn from_read(result: io::Result<usize>) -> Self {
        match result {
            Ok(0) => DisconnectReason::PeerClosed,
            Ok(n) => DisconnectReason::UnexpectedInput(n),
            Err(e) => DisconnectReason::ReadFailed(e.kind()),
        }
    }

    /// Whether the session ended because of an I/O failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DisconnectReason::ReadFailed(_) | DisconnectReason::WriteFailed(_)
        )
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::PeerClosed => write!(f, "peer closed connection"),
            DisconnectReason::UnexpectedInput(n) => write!(f, "peer sent {} byte(s)", n),
            DisconnectReason::ReadFailed(kind) => write!(f, "read failed: {}", kind),
            DisconnectReason::WriteFailed(kind) => write!(f, "write failed: {}", kind),
            DisconnectReason::Closed => write!(f, "relay closed session"),
        }
    }
}

/// Result of a finished session task
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Subscriber the session served
    pub id: SubscriberId,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// Why the session ended
    pub reason: DisconnectReason,
    /// Delivery statistics
    pub stats: SessionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_read() {
        assert_eq!(DisconnectReason::from_read(Ok(0)), DisconnectReason::PeerClosed);
        assert_eq!(
            DisconnectReason::from_read(Ok(3)),
            DisconnectReason::UnexpectedInput(3)
        );
        assert_eq!(
            DisconnectReason::from_read(Err(io::ErrorKind::ConnectionReset.into())),
            DisconnectReason::ReadFailed(io::ErrorKind::ConnectionReset)
        );
    }

    #[test]
    fn test_classification() {
        assert!(DisconnectReason::ReadFailed(io::ErrorKind::ConnectionReset).is_failure());
        assert!(DisconnectReason::WriteFailed(io::ErrorKind::BrokenPipe).is_failure());
        assert!(!DisconnectReason::PeerClosed.is_failure());
        assert!(!DisconnectReason::UnexpectedInput(1).is_failure());
        assert!(!DisconnectReason::Closed.is_failure());
    }

    #[test]
    fn test_display() {
        assert_eq!(DisconnectReason::UnexpectedInput(2).to_string(), "peer sent 2 byte(s)");
        assert_eq!(DisconnectReason::Closed.to_string(), "relay closed session");
    }
}
