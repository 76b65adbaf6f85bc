//! Subscriber registry for fan-out
//!
//! The registry holds every connected subscriber and one outbound queue per
//! subscriber. The control loop pushes each feed message onto every queue;
//! each subscriber's session task drains its own queue into the socket.
//!
//! # Architecture
//!
//! ```text
//!                      SubscriberRegistry (owned by the loop)
//!                     ┌──────────────────────────────┐
//!                     │ subscribers: HashMap<Id,     │
//!                     │   SubscriberEntry {          │
//!                     │     queue: Arc<OutboundQueue>│
//!                     │     task:  AbortHandle,      │
//!                     │   }                          │
//!                     │ >                            │
//!                     └──────────────┬───────────────┘
//!                                    │ broadcast()
//!         ┌──────────────────────────┼──────────────────────────┐
//!         ▼                          ▼                          ▼
//!   [OutboundQueue]            [OutboundQueue]            [OutboundQueue]
//!   next_outbound()            next_outbound()            next_outbound()
//!         │                          │                          │
//!   SubscriberSession ──► TCP  SubscriberSession ──► TCP  SubscriberSession ──► TCP
//! ```
//!
//! Messages carry `bytes::Bytes`, so every queue shares the line's single
//! allocation.

pub mod config;
pub mod entry;
pub mod queue;
pub mod store;

pub use config::{OverflowPolicy, RegistryConfig};
pub use entry::{SubscriberEntry, SubscriberHandle, SubscriberId};
pub use queue::{OutboundQueue, PushOutcome};
pub use store::{BroadcastReport, SubscriberRegistry};
