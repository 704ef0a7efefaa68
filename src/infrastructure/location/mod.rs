//! Location Module
//!
//! Acquires fixes from a location provider and feeds them into the bridge's
//! event queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  watch / unwatch   ┌─────────────────────┐
//! │ LocationWatcher  │ ─────────────────► │  LocationProvider   │
//! │ (one handle)     │                    │  (ReplayProvider,   │
//! └────────┬─────────┘                    │   host geolocation) │
//!          │                              └──────────┬──────────┘
//!          │ callbacks: Fix / LocationError          │
//!          ▼                                         │
//! ┌──────────────────┐ ◄─────────────────────────────┘
//! │  BridgeEvent     │
//! │  queue (mpsc)    │
//! └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`provider`] - Provider contract and watch options
//! - [`watcher`] - Owns the single subscription
//! - [`replay`] - Provider replaying a recorded track
//! - [`watchdog`] - Stall detection for the subscription

pub mod provider;
pub mod replay;
pub mod watchdog;
pub mod watcher;

pub use provider::{LocationProvider, ProviderError, WatchId, WatchOptions};
pub use replay::ReplayProvider;
pub use watchdog::StallWatchdog;
pub use watcher::LocationWatcher;
