//! Location provider contract
//!
//! Mirrors the host geolocation API: a continuous watch delivering each fix
//! or failure through callbacks until it is cancelled.

use crate::domain::models::{LocationError, PositionSample};
use crate::domain::settings::WatchSettings;
use std::time::Duration;
use thiserror::Error;

/// Called with every fix the provider produces
pub type FixCallback = Box<dyn FnMut(PositionSample) + Send>;

/// Called with every failed acquisition
pub type ErrorCallback = Box<dyn FnMut(LocationError) + Send>;

/// Handle of an active watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u32);

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Location provider unavailable: {0}")]
    Unavailable(String),
}

/// Acquisition policy passed to [`LocationProvider::watch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix that may be returned
    pub maximum_age: Duration,
    /// Per-fix deadline before the error callback fires with a timeout
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from(&WatchSettings::default())
    }
}

impl From<&WatchSettings> for WatchOptions {
    fn from(settings: &WatchSettings) -> Self {
        Self {
            high_accuracy: settings.high_accuracy,
            maximum_age: Duration::from_millis(settings.max_cache_age_ms),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

/// A source of continuous position updates.
///
/// A watch keeps producing fixes (retrying internally after failures) until
/// [`unwatch`](LocationProvider::unwatch) is called with its handle.
pub trait LocationProvider {
    fn watch(
        &mut self,
        on_fix: FixCallback,
        on_error: ErrorCallback,
        options: WatchOptions,
    ) -> Result<WatchId, ProviderError>;

    /// Cancel a watch. Unknown handles are ignored.
    fn unwatch(&mut self, id: WatchId);
}
