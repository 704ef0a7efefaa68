use crate::domain::models::{
    BridgeEvent, DeliveryOutcome, InboundMessage, Payload, TransactionId,
};
use crate::infrastructure::transport::Transport;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct MemoryState {
    sent: Vec<(TransactionId, Payload)>,
    next_id: u32,
    auto_ack: bool,
}

/// Transport that keeps everything in process.
///
/// Clones share state, so one handle can be given to the bridge while another
/// plays the peer: inspecting sends, acknowledging or failing them and
/// injecting inbound messages.
#[derive(Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
    event_sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl MemoryTransport {
    pub fn new(event_sender: mpsc::UnboundedSender<BridgeEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            event_sender,
        }
    }

    /// Acknowledge every send as soon as it is made.
    pub fn with_auto_ack(self) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.auto_ack = true;
        }
        self
    }

    pub fn sent(&self) -> Vec<(TransactionId, Payload)> {
        self.state
            .lock()
            .map(|s| s.sent.clone())
            .unwrap_or_default()
    }

    pub fn signal_ready(&self) {
        let _ = self.event_sender.send(BridgeEvent::TransportReady);
    }

    pub fn deliver_inbound(&self, message: InboundMessage) {
        let _ = self.event_sender.send(BridgeEvent::Inbound(message));
    }

    pub fn ack(&self, id: TransactionId) {
        self.complete(id, DeliveryOutcome::Acknowledged);
    }

    pub fn fail(&self, id: TransactionId, reason: &str) {
        self.complete(id, DeliveryOutcome::Failed(reason.to_string()));
    }

    fn complete(&self, id: TransactionId, outcome: DeliveryOutcome) {
        let _ = self
            .event_sender
            .send(BridgeEvent::Delivery { id, outcome });
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, payload: Payload) -> TransactionId {
        let (id, auto_ack) = match self.state.lock() {
            Ok(mut state) => {
                state.next_id += 1;
                let id = TransactionId(state.next_id);
                state.sent.push((id, payload));
                (id, state.auto_ack)
            }
            Err(_) => {
                let id = TransactionId(0);
                self.fail(id, "transport state poisoned");
                return id;
            }
        };

        if auto_ack {
            self.ack(id);
        }
        id
    }
}
