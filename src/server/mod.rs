//! Relay server
//!
//! Binds the subscriber port and runs the control loop that ties the feed,
//! the registry and the subscriber sessions together.

pub mod config;
pub mod listener;
pub mod termination;

pub use config::{ServerConfig, DEFAULT_BACKLOG, DEFAULT_PORT};
pub use listener::RelayServer;
pub use termination::{Termination, EXIT_END_OF_STREAM, EXIT_FEED_FAULT, EXIT_SETUP_FAILURE};
