//! Pacer location bridge.
//!
//! Streams position fixes from a location provider to a paired watch over a
//! message channel, and listens for simple commands coming back.
//!
//! - [`domain`]: sample and message types, encoding, distance, commands, settings
//! - [`infrastructure`]: location providers, transports, logging
//! - [`bridge`]: [`LocationBridge`], the event loop wiring it all together

pub mod bridge;
pub mod domain;
pub mod infrastructure;

pub use bridge::LocationBridge;
