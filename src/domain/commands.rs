//! Inbound command handling
//!
//! The peer can put a `command` field in any message it sends. The bridge only
//! recognises and logs the value; acting on it is up to whoever registers a
//! handler.

use crate::domain::models::{InboundMessage, Primitive};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Payload key carrying a peer command
pub const COMMAND_KEY: &str = "command";

/// Receives each recognised command value.
pub trait CommandDispatch: Send {
    fn dispatch(&mut self, command: &str);
}

pub type CommandHandler = Box<dyn FnMut(&str) + Send>;

/// Routes commands to handlers registered by name.
///
/// Every command is logged; commands without a handler stop there.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: CommandHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl CommandDispatch for CommandRegistry {
    fn dispatch(&mut self, command: &str) {
        info!("Peer command: {}", command);
        match self.handlers.get_mut(command) {
            Some(handler) => handler(command),
            None => debug!("No handler registered for command {:?}", command),
        }
    }
}

/// Inspects inbound messages for a command and dispatches it.
pub struct CommandListener {
    dispatcher: Box<dyn CommandDispatch>,
}

impl Default for CommandListener {
    fn default() -> Self {
        Self::new(Box::new(CommandRegistry::new()))
    }
}

impl CommandListener {
    pub fn new(dispatcher: Box<dyn CommandDispatch>) -> Self {
        Self { dispatcher }
    }

    /// Returns whether a command was dispatched.
    pub fn on_message(&mut self, message: &InboundMessage) -> bool {
        match message.payload.get(COMMAND_KEY) {
            Some(Primitive::Text(command)) => {
                self.dispatcher.dispatch(command);
                true
            }
            Some(other) => {
                warn!("Ignoring non-text command value: {}", other);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Payload;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl CommandDispatch for Recorder {
        fn dispatch(&mut self, command: &str) {
            self.0.lock().unwrap().push(command.to_string());
        }
    }

    fn message(entries: &[(&str, Primitive)]) -> InboundMessage {
        let payload: Payload = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        InboundMessage::new(payload)
    }

    #[test]
    fn command_is_dispatched_once() {
        let recorder = Recorder::default();
        let mut listener = CommandListener::new(Box::new(recorder.clone()));

        let dispatched =
            listener.on_message(&message(&[(COMMAND_KEY, Primitive::Text("stop".into()))]));

        assert!(dispatched);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["stop".to_string()]);
    }

    #[test]
    fn message_without_command_is_ignored() {
        let recorder = Recorder::default();
        let mut listener = CommandListener::new(Box::new(recorder.clone()));

        assert!(!listener.on_message(&InboundMessage::default()));
        assert!(!listener.on_message(&message(&[("other", Primitive::Int(1))])));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn non_text_command_is_not_dispatched() {
        let recorder = Recorder::default();
        let mut listener = CommandListener::new(Box::new(recorder.clone()));

        assert!(!listener.on_message(&message(&[(COMMAND_KEY, Primitive::Int(2))])));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn registry_routes_by_name() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        let sink = hits.clone();
        registry.register(
            "start",
            Box::new(move |cmd: &str| sink.lock().unwrap().push(cmd.to_string())),
        );
        assert!(registry.is_registered("start"));

        registry.dispatch("start");
        registry.dispatch("reset");

        assert_eq!(*hits.lock().unwrap(), vec!["start".to_string()]);
    }
}
