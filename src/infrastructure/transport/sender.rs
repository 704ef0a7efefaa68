use crate::domain::models::{DeliveryOutcome, OutboundMessage, TransactionId};
use crate::infrastructure::transport::Transport;
use tracing::{debug, warn};

/// Fire-and-forget adapter between the encoder and a [`Transport`].
///
/// Nothing waits on a delivery outcome and nothing is retried; outcomes are
/// only logged.
pub struct MessageSender<T: Transport> {
    transport: T,
}

impl<T: Transport> MessageSender<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn send(&mut self, message: &OutboundMessage) -> TransactionId {
        let id = self.transport.send(message.to_payload());
        debug!("Sent location message {}: {:?}", id, message);
        id
    }

    /// Log the completion signal for an earlier send.
    pub fn on_outcome(&self, id: TransactionId, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Acknowledged => debug!("Delivered message {}", id),
            DeliveryOutcome::Failed(reason) => {
                warn!("Unable to deliver message {}: {}", id, reason)
            }
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
