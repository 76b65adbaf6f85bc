//! Line-oriented broadcast relay
//!
//! Reads newline-terminated records from a single feed (usually a named pipe
//! written by a slow producer) and relays every record, unmodified and in
//! order, to every connected TCP subscriber.
//!
//! - One feed, many subscribers; each subscriber gets its own FIFO queue.
//! - Subscribers only receive lines read after they connected.
//! - Anything a subscriber sends, or closing its socket, disconnects it.
//! - A failing subscriber never affects the others.
//! - End-of-stream on the feed ends the relay.
//!
//! # Example
//! ```no_run
//! use line_relay::{feed, RelayServer, ServerConfig};
//!
//! # async fn example() -> line_relay::Result<()> {
//! let server = RelayServer::bind(ServerConfig::default()).await?;
//! let feed = feed::open(feed::DEFAULT_FEED_PATH).await?;
//!
//! let termination = server.run(feed).await;
//! std::process::exit(i32::from(termination.exit_code()));
//! # }
//! ```

pub mod error;
pub mod feed;
pub mod logging;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use feed::{FeedReader, Message};
pub use registry::{OverflowPolicy, RegistryConfig, SubscriberId, SubscriberRegistry};
pub use server::{RelayServer, ServerConfig, Termination};
pub use stats::{RelayStats, SessionStats};
