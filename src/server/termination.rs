//! How a relay run ends

use std::io;

/// Process exit status when the feed reaches end-of-stream
pub const EXIT_END_OF_STREAM: u8 = 0;

/// Process exit status when reading the feed fails
pub const EXIT_FEED_FAULT: u8 = 1;

/// Process exit status when the relay cannot start
pub const EXIT_SETUP_FAILURE: u8 = 2;

/// Reason the control loop stopped
///
/// The feed is the only thing that can end a running relay; subscriber
/// failures never do.
#[derive(Debug)]
pub enum Termination {
    /// The feed reported end-of-stream: no producer is left
    EndOfStream,
    /// Reading the feed failed
    FeedFault(io::Error),
    /// The shutdown future passed to `run_until` completed
    Interrupted,
}

impl Termination {
    /// Exit status the binary reports for this termination
    pub fn exit_code(&self) -> u8 {
        match self {
            Termination::EndOfStream | Termination::Interrupted => EXIT_END_OF_STREAM,
            Termination::FeedFault(_) => EXIT_FEED_FAULT,
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::EndOfStream => write!(f, "feed reached end of stream"),
            Termination::FeedFault(e) => write!(f, "feed fault: {}", e),
            Termination::Interrupted => write!(f, "interrupted"),
        }
    }
}
