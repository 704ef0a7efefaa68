use crate::domain::models::BridgeEvent;
use crate::infrastructure::location::provider::{
    LocationProvider, ProviderError, WatchId, WatchOptions,
};
use tokio::sync::mpsc;
use tracing::info;

/// Owns the single location subscription and forwards what it yields.
///
/// Every fix is pushed onto the event queue as it arrives, in provider order,
/// with no buffering or coalescing. Failures go the same way so the bridge can
/// log them. Retrying is left to the provider's continuous watch.
pub struct LocationWatcher<P: LocationProvider> {
    provider: P,
    options: WatchOptions,
    event_sender: mpsc::UnboundedSender<BridgeEvent>,
    subscription: Option<WatchId>,
}

impl<P: LocationProvider> LocationWatcher<P> {
    pub fn new(
        provider: P,
        options: WatchOptions,
        event_sender: mpsc::UnboundedSender<BridgeEvent>,
    ) -> Self {
        Self {
            provider,
            options,
            event_sender,
            subscription: None,
        }
    }

    /// Subscribe to location updates. Does nothing if already subscribed.
    pub fn start(&mut self) -> Result<WatchId, ProviderError> {
        if let Some(id) = self.subscription {
            return Ok(id);
        }

        info!("Subscribing to location updates ({:?})", self.options);

        let fix_sender = self.event_sender.clone();
        let error_sender = self.event_sender.clone();
        let id = self.provider.watch(
            Box::new(move |sample| {
                let _ = fix_sender.send(BridgeEvent::Fix(sample));
            }),
            Box::new(move |error| {
                let _ = error_sender.send(BridgeEvent::LocationError(error));
            }),
            self.options,
        )?;

        self.subscription = Some(id);
        Ok(id)
    }

    /// Cancel the subscription, if any.
    pub fn stop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.provider.unwatch(id);
            info!("Unsubscribed from location updates");
        }
    }

    /// Drop the current subscription and register a fresh one.
    pub fn restart(&mut self) -> Result<WatchId, ProviderError> {
        self.stop();
        self.start()
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn subscription(&self) -> Option<WatchId> {
        self.subscription
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
