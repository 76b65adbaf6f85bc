//! Subscriber sessions
//!
//! A session is the task that serves one connected subscriber: it drains the
//! subscriber's queue into the socket and reports why it stopped.

pub mod connection;
pub mod state;

pub use connection::{SubscriberSession, DEFAULT_PROBE_SIZE};
pub use state::{DisconnectReason, SessionOutcome};
