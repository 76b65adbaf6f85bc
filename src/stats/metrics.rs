//! Statistics for the relay and its subscriber sessions

use std::time::Duration;

use crate::feed::Message;
use crate::registry::BroadcastReport;

/// Per-subscriber session statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Messages fully written to the subscriber
    pub messages_sent: u64,
    /// Bytes written to the subscriber
    pub bytes_sent: u64,
    /// Connection duration
    pub duration: Duration,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message fully written
    pub fn record_sent(&mut self, message: &Message) {
        self.messages_sent += 1;
        self.bytes_sent += message.len() as u64;
    }

    /// Average throughput in bytes per second
    pub fn throughput(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            self.bytes_sent / secs
        } else {
            0
        }
    }
}

/// Relay-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Lines read from the feed
    pub messages_read: u64,
    /// Bytes read from the feed
    pub bytes_read: u64,
    /// Lines read while no subscriber was connected
    pub messages_discarded: u64,
    /// Queue entries lost to the depth limit
    pub messages_dropped: u64,
    /// Connections accepted as subscribers
    pub subscribers_accepted: u64,
    /// Connections closed immediately because of the subscriber limit
    pub subscribers_rejected: u64,
    /// Subscribers removed (disconnect, write failure or overflow)
    pub subscribers_evicted: u64,
    /// Currently connected subscribers
    pub active_subscribers: u64,
    /// Time since the relay started
    pub uptime: Duration,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one line read from the feed and what its broadcast did
    pub fn record_broadcast(&mut self, message: &Message, report: &BroadcastReport) {
        self.messages_read += 1;
        self.bytes_read += message.len() as u64;
        self.messages_dropped += report.dropped as u64;
        self.subscribers_evicted += report.evicted.len() as u64;

        if report.reached_nobody() {
            self.messages_discarded += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriberId;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.messages_sent, 0);
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.duration, Duration::ZERO);
    }

    #[test]
    fn test_session_stats_record_sent() {
        let mut stats = SessionStats::new();
        stats.record_sent(&Message::new(1, "A\n"));
        stats.record_sent(&Message::new(2, "BCD\n"));

        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.bytes_sent, 6);
    }

    #[test]
    fn test_session_stats_throughput() {
        let mut stats = SessionStats::new();
        stats.bytes_sent = 1_000_000;
        stats.duration = Duration::from_secs(10);

        assert_eq!(stats.throughput(), 100_000);
    }

    #[test]
    fn test_session_stats_throughput_zero_duration() {
        let mut stats = SessionStats::new();
        stats.bytes_sent = 1_000_000;

        assert_eq!(stats.throughput(), 0);
    }

    #[test]
    fn test_relay_stats_delivered() {
        let mut stats = RelayStats::new();
        let report = BroadcastReport {
            delivered: 3,
            ..Default::default()
        };

        stats.record_broadcast(&Message::new(1, "A\n"), &report);

        assert_eq!(stats.messages_read, 1);
        assert_eq!(stats.bytes_read, 2);
        assert_eq!(stats.messages_discarded, 0);
    }

    #[test]
    fn test_relay_stats_no_readers() {
        let mut stats = RelayStats::new();

        stats.record_broadcast(&Message::new(1, "A\n"), &BroadcastReport::default());

        assert_eq!(stats.messages_read, 1);
        assert_eq!(stats.messages_discarded, 1);
    }

    #[test]
    fn test_relay_stats_overflow() {
        let mut stats = RelayStats::new();
        let report = BroadcastReport {
            delivered: 1,
            dropped: 2,
            evicted: vec![SubscriberId(4)],
        };

        stats.record_broadcast(&Message::new(1, "A\n"), &report);

        assert_eq!(stats.messages_dropped, 2);
        assert_eq!(stats.subscribers_evicted, 1);
        assert_eq!(stats.messages_discarded, 0);
    }
}
