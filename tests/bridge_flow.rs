use chrono::Utc;
use pacer_bridge::domain::commands::{CommandListener, CommandRegistry};
use pacer_bridge::domain::encoder::MessageEncoder;
use pacer_bridge::domain::models::{
    BridgeEvent, Coordinates, InboundMessage, LocationError, LocationErrorKind, Payload,
    PositionSample, Primitive,
};
use pacer_bridge::domain::settings::Settings;
use pacer_bridge::infrastructure::location::provider::{ErrorCallback, FixCallback};
use pacer_bridge::infrastructure::location::{
    LocationProvider, ProviderError, WatchId, WatchOptions,
};
use pacer_bridge::infrastructure::transport::MemoryTransport;
use pacer_bridge::LocationBridge;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// 2015-04-25T21:13:20Z
const T: i64 = 1_429_996_400_000;

#[derive(Default)]
struct Script {
    next_id: u32,
    active: HashMap<u32, (FixCallback, ErrorCallback)>,
    options: Vec<WatchOptions>,
    unwatched: Vec<WatchId>,
}

/// Provider whose fixes are pushed by the test.
#[derive(Clone, Default)]
struct ScriptedProvider(Arc<Mutex<Script>>);

impl ScriptedProvider {
    fn fix(&self, sample: PositionSample) {
        let mut script = self.0.lock().unwrap();
        for (on_fix, _) in script.active.values_mut() {
            on_fix(sample);
        }
    }

    fn fail(&self, error: LocationError) {
        let mut script = self.0.lock().unwrap();
        for (_, on_error) in script.active.values_mut() {
            on_error(error.clone());
        }
    }

    fn watch_count(&self) -> usize {
        self.0.lock().unwrap().options.len()
    }

    fn active_count(&self) -> usize {
        self.0.lock().unwrap().active.len()
    }

    fn unwatched(&self) -> Vec<WatchId> {
        self.0.lock().unwrap().unwatched.clone()
    }
}

impl LocationProvider for ScriptedProvider {
    fn watch(
        &mut self,
        on_fix: FixCallback,
        on_error: ErrorCallback,
        options: WatchOptions,
    ) -> Result<WatchId, ProviderError> {
        let mut script = self.0.lock().unwrap();
        script.next_id += 1;
        let id = script.next_id;
        script.active.insert(id, (on_fix, on_error));
        script.options.push(options);
        Ok(WatchId(id))
    }

    fn unwatch(&mut self, id: WatchId) {
        let mut script = self.0.lock().unwrap();
        script.active.remove(&id.0);
        script.unwatched.push(id);
    }
}

type TestBridge = LocationBridge<ScriptedProvider, MemoryTransport, Utc>;

struct Harness {
    bridge: TestBridge,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    provider: ScriptedProvider,
    peer: MemoryTransport,
}

impl Harness {
    fn new(settings: Settings) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let provider = ScriptedProvider::default();
        let peer = MemoryTransport::new(tx.clone());
        let bridge = LocationBridge::with_encoder(
            provider.clone(),
            peer.clone(),
            tx,
            &settings,
            MessageEncoder::with_timezone(Utc),
        );
        Self {
            bridge,
            events,
            provider,
            peer,
        }
    }

    /// Handle everything queued so far, including events raised while handling.
    fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.bridge.handle_event(event);
        }
    }

    fn sent_lats(&self) -> Vec<Primitive> {
        self.peer
            .sent()
            .into_iter()
            .map(|(_, payload)| payload["lat"].clone())
            .collect()
    }
}

fn fix(latitude: f64, longitude: f64) -> PositionSample {
    PositionSample::new(
        T,
        Coordinates {
            speed: Some(0.0),
            altitude: Some(0.0),
            accuracy: Some(999.0),
            ..Coordinates::new(latitude, longitude)
        },
    )
}

fn command(value: &str) -> InboundMessage {
    let mut payload = Payload::new();
    payload.insert("command".into(), Primitive::Text(value.into()));
    InboundMessage::new(payload)
}

#[test]
fn ready_subscribes_once_with_the_fixed_policy() {
    let mut h = Harness::new(Settings::default());

    h.peer.signal_ready();
    h.peer.signal_ready();
    h.pump();

    assert_eq!(h.provider.watch_count(), 1);
    assert_eq!(
        h.provider.0.lock().unwrap().options[0],
        WatchOptions {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_millis(50),
        }
    );
    assert!(h.bridge.is_watching());
}

#[test]
fn provider_fix_reaches_the_peer_in_wire_shape() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    h.provider.fix(fix(54.4, -1.23));
    h.pump();

    let sent = h.peer.sent();
    assert_eq!(sent.len(), 1);
    let payload = &sent[0].1;
    let expected: Payload = [
        ("timestamp", Primitive::Int(T)),
        ("day", Primitive::Int(25)),
        ("mon", Primitive::Int(4)),
        ("year", Primitive::Int(2015)),
        ("hour", Primitive::Int(21)),
        ("min", Primitive::Int(13)),
        ("sec", Primitive::Int(20)),
        ("lat", Primitive::Int(54400)),
        ("lon", Primitive::Int(-1230)),
        ("speed", Primitive::Int(0)),
        ("heading", Primitive::Int(0)),
        ("alt", Primitive::Number(0.0)),
        ("acc", Primitive::Number(999.0)),
        ("alt_acc", Primitive::Number(0.0)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    assert_eq!(payload, &expected);
}

#[test]
fn fixes_are_sent_in_provider_order() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    h.provider.fix(fix(1.0, 0.0));
    h.provider.fix(fix(2.0, 0.0));
    h.provider.fix(fix(3.0, 0.0));
    h.pump();

    assert_eq!(
        h.sent_lats(),
        vec![
            Primitive::Int(1000),
            Primitive::Int(2000),
            Primitive::Int(3000)
        ]
    );
}

#[test]
fn last_position_follows_the_track() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();
    assert!(h.bridge.last_position().is_none());

    h.provider.fix(fix(50.0, 0.0));
    h.provider.fix(fix(50.0, 1.0));
    h.pump();

    let last = *h.bridge.last_position().unwrap();
    assert_eq!((last.latitude, last.longitude), (50.0, 1.0));
    // One degree of longitude at 50N
    let step = last.distance_to(&Coordinates::new(50.0, 0.0));
    assert!((step - 71_700.0).abs() < 717.0, "step was {}", step);
}

#[test]
fn schema_violation_drops_only_that_fix() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    let mut bad = fix(1.0, 0.0);
    bad.coords.altitude = None;
    h.provider.fix(bad);
    h.provider.fix(fix(2.0, 0.0));
    h.pump();

    assert_eq!(h.sent_lats(), vec![Primitive::Int(2000)]);
    assert!(h.bridge.is_watching());
}

#[test]
fn failures_are_not_fatal_and_never_retried() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    h.provider.fail(LocationError::new(
        LocationErrorKind::Timeout,
        "Timeout expired",
    ));
    h.provider.fix(fix(1.0, 0.0));
    h.pump();
    let (first, _) = h.peer.sent()[0].clone();
    h.peer.fail(first, "APP_MSG_SEND_TIMEOUT");
    h.provider.fix(fix(2.0, 0.0));
    h.pump();

    // The failed message is not resent; the next fix still goes out.
    assert_eq!(
        h.sent_lats(),
        vec![Primitive::Int(1000), Primitive::Int(2000)]
    );
    assert_eq!(h.provider.watch_count(), 1);
}

#[test]
fn inbound_commands_are_dispatched_by_name() {
    let stops = Arc::new(Mutex::new(0));
    let counter = stops.clone();
    let mut registry = CommandRegistry::new();
    registry.register(
        "stop",
        Box::new(move |_: &str| *counter.lock().unwrap() += 1),
    );

    let mut h = Harness::new(Settings::default());
    h.bridge = h.bridge.with_commands(CommandListener::new(Box::new(registry)));

    h.peer.deliver_inbound(command("stop"));
    h.peer.deliver_inbound(InboundMessage::default());
    h.peer.deliver_inbound(command("start"));
    h.pump();

    assert_eq!(*stops.lock().unwrap(), 1);
    // Inbound traffic does not touch the outbound path.
    assert!(h.peer.sent().is_empty());
}

#[test]
fn link_test_sample_is_sent_on_ready_when_enabled() {
    let mut settings = Settings::default();
    settings.bridge.send_sample_on_ready = true;
    let mut h = Harness::new(settings);

    h.peer.signal_ready();
    h.pump();

    let sent = h.peer.sent();
    assert_eq!(sent.len(), 1);
    let payload = &sent[0].1;
    assert_eq!(payload["lat"], Primitive::Int(54400));
    assert_eq!(payload["lon"], Primitive::Int(-1230));
    assert_eq!(payload["heading"], Primitive::Int(0));
    assert_eq!(payload["acc"], Primitive::Number(999.0));
    assert_eq!(payload["alt_acc"], Primitive::Number(0.0));
}

#[test]
fn stop_unwatches_and_is_idempotent() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    h.bridge.stop();
    h.bridge.stop();

    assert!(!h.bridge.is_watching());
    assert_eq!(h.provider.active_count(), 0);
    assert_eq!(h.provider.unwatched(), vec![WatchId(1)]);
}

#[test]
fn bridges_are_independent() {
    let mut a = Harness::new(Settings::default());
    let mut b = Harness::new(Settings::default());

    a.peer.signal_ready();
    a.pump();
    b.pump();

    assert!(a.bridge.is_watching());
    assert!(!b.bridge.is_watching());
    assert_eq!(b.provider.watch_count(), 0);
}

#[test]
fn watchdog_is_off_by_default() {
    let mut h = Harness::new(Settings::default());
    h.peer.signal_ready();
    h.pump();

    let later = tokio::time::Instant::now() + Duration::from_secs(3600);
    assert!(!h.bridge.check_watchdog(later));
    assert_eq!(h.provider.watch_count(), 1);
}

#[test]
fn stalled_subscription_is_replaced() {
    let mut settings = Settings::default();
    settings.watch.stall_timeout_ms = Some(1000);
    let mut h = Harness::new(settings);
    h.peer.signal_ready();
    h.pump();

    let now = tokio::time::Instant::now();
    assert!(!h.bridge.check_watchdog(now));
    assert!(h.bridge.check_watchdog(now + Duration::from_secs(2)));

    assert_eq!(h.provider.watch_count(), 2);
    assert_eq!(h.provider.active_count(), 1);
    assert_eq!(h.provider.unwatched(), vec![WatchId(1)]);

    // New subscription delivers as usual.
    h.provider.fix(fix(5.0, 0.0));
    h.pump();
    assert_eq!(h.sent_lats(), vec![Primitive::Int(5000)]);
}

#[tokio::test]
async fn run_loop_resubscribes_a_silent_provider() {
    let mut settings = Settings::default();
    settings.watch.stall_timeout_ms = Some(20);
    let mut h = Harness::new(settings);
    h.peer.signal_ready();

    let _ = tokio::time::timeout(Duration::from_millis(300), h.bridge.run(h.events)).await;

    assert!(h.provider.watch_count() >= 2);
    assert_eq!(h.provider.active_count(), 1);
}
