//! Inbound feed
//!
//! The feed is the single line-oriented input of the relay, usually a named
//! pipe written by a slow producer. Each line becomes one [`Message`].
//! End-of-stream on the feed ends the relay.

pub mod message;
pub mod reader;

pub use message::Message;
pub use reader::{open, FeedReader, FeedSource, DEFAULT_FEED_PATH};
