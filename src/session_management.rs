//! Subscriber session management.
//!
//! This module provides the subscriber handle and the registry used to fan
//! live metrics out to every connected WebSocket client.

/// Registry of active subscribers and best-effort fan-out.
pub mod connection_registry;
/// Subscriber handle and the envelope pushed to it.
pub mod subscriber;

pub use connection_registry::ConnectionRegistry;
pub use subscriber::{Envelope, SubscriberSession};
