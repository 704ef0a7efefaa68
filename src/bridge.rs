//! Location -> watch bridge
//!
//! Ties the pieces together on a single event queue:
//!
//! ```text
//! LocationWatcher ──Fix──► MessageEncoder ──► MessageSender ──► Transport
//!                                                   ▲
//! Transport ──Delivery (ack / fail)─────────────────┘
//! Transport ──Inbound──► CommandListener
//! ```
//!
//! Fixes are encoded and sent in the order they arrive. The outbound and
//! inbound paths are independent. Failures of any kind are logged and only
//! affect the fix or message they belong to.

use crate::domain::commands::CommandListener;
use crate::domain::encoder::{EncodeError, MessageEncoder};
use crate::domain::models::{BridgeEvent, Coordinates, PositionSample, TransactionId};
use crate::domain::settings::{BridgeSettings, Settings};
use crate::infrastructure::location::{
    LocationProvider, LocationWatcher, ProviderError, StallWatchdog, WatchId, WatchOptions,
};
use crate::infrastructure::transport::{MessageSender, Transport};
use chrono::{Local, TimeZone, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Fix sent once on startup to prove the link, when enabled.
pub fn link_test_sample(timestamp: i64) -> PositionSample {
    PositionSample::new(
        timestamp,
        Coordinates {
            latitude: 54.4,
            longitude: -1.23,
            speed: Some(0.0),
            heading: None,
            altitude: Some(0.0),
            accuracy: Some(999.0),
            altitude_accuracy: None,
        },
    )
}

/// The bridge: owns the location subscription, the encoder, the outbound
/// sender and the command listener.
pub struct LocationBridge<P, T, Tz = Local>
where
    P: LocationProvider,
    T: Transport,
    Tz: TimeZone,
{
    watcher: LocationWatcher<P>,
    encoder: MessageEncoder<Tz>,
    sender: MessageSender<T>,
    commands: CommandListener,
    settings: BridgeSettings,
    watchdog: Option<StallWatchdog>,
    last_position: Option<Coordinates>,
    wants_location: bool,
    ready: bool,
}

impl<P: LocationProvider, T: Transport> LocationBridge<P, T, Local> {
    pub fn new(
        provider: P,
        transport: T,
        event_sender: mpsc::UnboundedSender<BridgeEvent>,
        settings: &Settings,
    ) -> Self {
        Self::with_encoder(
            provider,
            transport,
            event_sender,
            settings,
            MessageEncoder::local(),
        )
    }
}

impl<P, T, Tz> LocationBridge<P, T, Tz>
where
    P: LocationProvider,
    T: Transport,
    Tz: TimeZone,
{
    pub fn with_encoder(
        provider: P,
        transport: T,
        event_sender: mpsc::UnboundedSender<BridgeEvent>,
        settings: &Settings,
        encoder: MessageEncoder<Tz>,
    ) -> Self {
        let watchdog = settings
            .watch
            .stall_timeout_ms
            .map(|ms| StallWatchdog::new(Duration::from_millis(ms)));

        Self {
            watcher: LocationWatcher::new(
                provider,
                WatchOptions::from(&settings.watch),
                event_sender,
            ),
            encoder,
            sender: MessageSender::new(transport),
            commands: CommandListener::default(),
            settings: settings.bridge.clone(),
            watchdog,
            last_position: None,
            wants_location: false,
            ready: false,
        }
    }

    /// Replace the default (log-only) command listener.
    pub fn with_commands(mut self, commands: CommandListener) -> Self {
        self.commands = commands;
        self
    }

    /// Subscribe to location updates.
    pub fn start(&mut self) -> Result<WatchId, ProviderError> {
        self.wants_location = true;
        let id = self.watcher.start()?;
        if let Some(dog) = self.watchdog.as_mut() {
            dog.feed();
        }
        Ok(id)
    }

    /// Cancel the location subscription. Safe to call more than once.
    pub fn stop(&mut self) {
        self.wants_location = false;
        self.watcher.stop();
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_watching()
    }

    /// Coordinates of the most recent fix received.
    pub fn last_position(&self) -> Option<&Coordinates> {
        self.last_position.as_ref()
    }

    pub fn watcher(&self) -> &LocationWatcher<P> {
        &self.watcher
    }

    pub fn transport(&self) -> &T {
        self.sender.transport()
    }

    /// Encode a fix and hand it to the transport.
    pub fn forward(&mut self, sample: &PositionSample) -> Result<TransactionId, EncodeError> {
        let message = self.encoder.encode(sample)?;
        Ok(self.sender.send(&message))
    }

    pub fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::TransportReady => self.on_ready(),
            BridgeEvent::Fix(sample) => {
                self.feed_watchdog();
                if let Some(step) = self.step_from_last(sample.coords) {
                    debug!("Moved {:.1} m since previous fix", step);
                }
                if let Err(e) = self.forward(&sample) {
                    error!("Dropping fix: {}", e);
                }
            }
            BridgeEvent::LocationError(err) => {
                self.feed_watchdog();
                warn!("Location error: {}", err);
            }
            BridgeEvent::Inbound(message) => {
                debug!("Received message: {:?}", message.payload);
                self.commands.on_message(&message);
            }
            BridgeEvent::Delivery { id, outcome } => self.sender.on_outcome(id, &outcome),
        }
    }

    fn on_ready(&mut self) {
        if self.ready {
            debug!("Transport ready signalled again, ignoring");
            return;
        }
        self.ready = true;
        info!("Pacer bridge started");

        if let Err(e) = self.start() {
            error!("Could not subscribe to location updates: {}", e);
        }

        if self.settings.send_sample_on_ready {
            let sample = link_test_sample(Utc::now().timestamp_millis());
            info!("Sending link test sample");
            if let Err(e) = self.forward(&sample) {
                error!("Link test sample rejected: {}", e);
            }
        }
    }

    fn step_from_last(&mut self, coords: Coordinates) -> Option<f64> {
        let step = self.last_position.map(|prev| prev.distance_to(&coords));
        self.last_position = Some(coords);
        step
    }

    fn feed_watchdog(&mut self) {
        if let Some(dog) = self.watchdog.as_mut() {
            dog.feed();
        }
    }

    fn watchdog_deadline(&self) -> Option<Instant> {
        if !self.wants_location {
            return None;
        }
        self.watchdog.as_ref().map(StallWatchdog::deadline)
    }

    /// Re-establish the subscription if it has stalled. Returns whether a
    /// resubscription was attempted.
    pub fn check_watchdog(&mut self, now: Instant) -> bool {
        if !self.wants_location {
            return false;
        }
        let Some(dog) = self.watchdog.as_mut() else {
            return false;
        };
        if !dog.is_stalled(now) {
            return false;
        }

        warn!(
            "No location activity for {:?}, resubscribing",
            dog.window()
        );
        dog.feed_at(now);

        let result = if self.watcher.is_watching() {
            self.watcher.restart()
        } else {
            self.watcher.start()
        };
        match result {
            Ok(id) => info!("Resubscribed to location updates (watch {})", id.0),
            Err(e) => error!("Location resubscription failed: {}", e),
        }
        true
    }

    /// Process events until the queue closes. The watcher holds a sender of
    /// its own, so in practice this runs until the future is dropped.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<BridgeEvent>) {
        loop {
            let deadline = self.watchdog_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = wait_until(deadline) => {
                    self.check_watchdog(Instant::now());
                }
            }
        }
        debug!("Event queue closed");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
