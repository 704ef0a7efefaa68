//! Local socket transport
//!
//! The bridge listens on a local socket and the peer gateway (the process that
//! owns the radio link to the watch) connects to it. Frames are described in
//! [`wire`](crate::infrastructure::transport::wire).
//!
//! The first peer connection raises the ready event. Sends made while no peer
//! is connected fail straight away; nothing is queued.
//!
//! `send` only hands the frame to a per-peer writer thread through a bounded
//! outbox. When the peer stops reading and the outbox fills up, further sends
//! fail instead of waiting.

use crate::domain::models::{BridgeEvent, DeliveryOutcome, InboundMessage, Payload, TransactionId};
use crate::infrastructure::transport::wire::Frame;
use crate::infrastructure::transport::{Transport, TransportError};
use interprocess::local_socket::{
    traits::ListenerExt, GenericFilePath, GenericNamespaced, Listener, ListenerOptions, Name,
    NameType, Stream as LocalStream, ToFsName, ToNsName,
};
use interprocess::TryClone;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// Frames that may wait for the writer thread before sends start failing
pub const OUTBOX_CAPACITY: usize = 64;

type Outbox = mpsc::Sender<(TransactionId, String)>;
type PeerSlot = Arc<Mutex<Option<Outbox>>>;

/// Resolve a socket name for this platform: namespaced where supported,
/// otherwise a file in the temp directory.
pub fn socket_name(name: &str) -> io::Result<Name<'static>> {
    if GenericNamespaced::is_supported() {
        name.to_string().to_ns_name::<GenericNamespaced>()
    } else {
        std::env::temp_dir()
            .join(name)
            .to_fs_name::<GenericFilePath>()
    }
}

pub struct LocalSocketTransport {
    peer: PeerSlot,
    next_id: u32,
    event_sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl LocalSocketTransport {
    /// Bind `name` and start accepting the peer on a background thread.
    pub fn listen(
        name: &str,
        event_sender: mpsc::UnboundedSender<BridgeEvent>,
    ) -> Result<Self, TransportError> {
        if !GenericNamespaced::is_supported() {
            // A previous run may have left the socket file behind
            let _ = std::fs::remove_file(std::env::temp_dir().join(name));
        }

        let listener = ListenerOptions::new()
            .name(socket_name(name)?)
            .create_sync()?;
        info!("Listening for peer on {}", name);

        let peer: PeerSlot = Arc::new(Mutex::new(None));
        let accept_peer = peer.clone();
        let accept_sender = event_sender.clone();
        std::thread::Builder::new()
            .name("peer-link".to_string())
            .spawn(move || accept_loop(listener, accept_peer, accept_sender))?;

        Ok(Self {
            peer,
            next_id: 0,
            event_sender,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.peer.lock().map(|p| p.is_some()).unwrap_or(false)
    }

    fn enqueue_frame(&self, id: TransactionId, payload: Payload) -> Result<(), String> {
        let line = Frame::AppMessage {
            transaction_id: Some(id),
            payload,
        }
        .to_line()
        .map_err(|e| e.to_string())?;

        let mut slot = self
            .peer
            .lock()
            .map_err(|_| "peer link lock poisoned".to_string())?;
        let outbox = slot.as_ref().ok_or_else(|| "not connected".to_string())?;

        match outbox.try_send((id, line)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err("peer not keeping up".to_string()),
            Err(TrySendError::Closed(_)) => {
                *slot = None;
                Err("not connected".to_string())
            }
        }
    }
}

impl Transport for LocalSocketTransport {
    fn send(&mut self, payload: Payload) -> TransactionId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = TransactionId(self.next_id);

        if let Err(reason) = self.enqueue_frame(id, payload) {
            let _ = self.event_sender.send(BridgeEvent::Delivery {
                id,
                outcome: DeliveryOutcome::Failed(reason),
            });
        }
        id
    }
}

fn accept_loop(
    listener: Listener,
    peer: PeerSlot,
    event_sender: mpsc::UnboundedSender<BridgeEvent>,
) {
    let mut announced = false;

    for conn in listener.incoming() {
        let stream = match conn {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Peer accept failed: {}", e);
                continue;
            }
        };
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(e) => {
                warn!("Could not clone peer stream: {}", e);
                continue;
            }
        };

        let (outbox, frames) = mpsc::channel(OUTBOX_CAPACITY);
        let writer_sender = event_sender.clone();
        if let Err(e) = std::thread::Builder::new()
            .name("peer-writer".to_string())
            .spawn(move || write_frames(writer, frames, writer_sender))
        {
            warn!("Could not start peer writer: {}", e);
            continue;
        }

        if let Ok(mut slot) = peer.lock() {
            *slot = Some(outbox);
        }
        info!("Peer connected");

        if !announced {
            announced = true;
            if event_sender.send(BridgeEvent::TransportReady).is_err() {
                return;
            }
        }

        read_frames(stream, &event_sender);

        // Dropping the outbox ends the writer thread
        if let Ok(mut slot) = peer.lock() {
            *slot = None;
        }
        info!("Peer disconnected");

        if event_sender.is_closed() {
            return;
        }
    }
}

fn write_frames(
    mut stream: LocalStream,
    mut frames: mpsc::Receiver<(TransactionId, String)>,
    event_sender: mpsc::UnboundedSender<BridgeEvent>,
) {
    while let Some((id, line)) = frames.blocking_recv() {
        let written = stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush());
        if let Err(e) = written {
            warn!("Peer write failed: {}", e);
            let _ = event_sender.send(BridgeEvent::Delivery {
                id,
                outcome: DeliveryOutcome::Failed(e.to_string()),
            });

            // Nothing queued behind a failed write can reach the peer
            frames.close();
            while let Some((id, _)) = frames.blocking_recv() {
                let _ = event_sender.send(BridgeEvent::Delivery {
                    id,
                    outcome: DeliveryOutcome::Failed("not connected".to_string()),
                });
            }
            return;
        }
    }
}

fn read_frames(stream: LocalStream, event_sender: &mpsc::UnboundedSender<BridgeEvent>) {
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Peer read error: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match Frame::from_line(&line) {
            Ok(Frame::Ack { transaction_id }) => BridgeEvent::Delivery {
                id: transaction_id,
                outcome: DeliveryOutcome::Acknowledged,
            },
            Ok(Frame::Nack {
                transaction_id,
                reason,
            }) => BridgeEvent::Delivery {
                id: transaction_id,
                outcome: DeliveryOutcome::Failed(if reason.is_empty() {
                    "rejected by peer".to_string()
                } else {
                    reason
                }),
            },
            Ok(Frame::AppMessage { payload, .. }) => {
                BridgeEvent::Inbound(InboundMessage::new(payload))
            }
            Err(e) => {
                warn!("Skipping malformed peer frame {:?}: {}", line, e);
                continue;
            }
        };

        if event_sender.send(event).is_err() {
            return;
        }
    }
}
