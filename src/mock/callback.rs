//! Callback-convention mock channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::transport::{
    CallbackChannel, CallbackListener, Destination, PeerId, ReplyCallback, SenderMetadata,
};

use super::SentMessage;

/// Scripted behavior for one destination of a [`MockCallbackChannel`].
///
/// The callback convention has no distinct send-failure shape: a host
/// that fails simply never invokes the completion callback, which is
/// the same as [`CallbackBehavior::NoReply`].
#[derive(Clone)]
pub enum CallbackBehavior {
    /// The completion callback is dropped without being invoked.
    NoReply,
    /// Some listener answers with exactly this value.
    Scripted(Value),
    /// Deliver the message to the listener attached on the given
    /// channel, as if it were the peer process.
    DeliverTo(Arc<MockCallbackChannel>),
}

/// Scriptable in-memory implementation of the callback-convention
/// host boundary.
pub struct MockCallbackChannel {
    default_behavior: Mutex<CallbackBehavior>,
    peer_behaviors: Mutex<HashMap<PeerId, CallbackBehavior>>,
    listener: Mutex<Option<CallbackListener>>,
    listener_registrations: AtomicUsize,
    log: Mutex<Vec<SentMessage>>,
}

impl MockCallbackChannel {
    /// New channel; every destination produces no reply until
    /// scripted otherwise.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            default_behavior: Mutex::new(CallbackBehavior::NoReply),
            peer_behaviors: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
            listener_registrations: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Script the behavior for sends to the default peer.
    pub fn script_default(&self, behavior: CallbackBehavior) {
        *self.default_behavior.lock().unwrap() = behavior;
    }

    /// Script the behavior for sends addressed to a specific peer.
    pub fn script_peer(&self, peer: PeerId, behavior: CallbackBehavior) {
        self.peer_behaviors.lock().unwrap().insert(peer, behavior);
    }

    /// All sends observed so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.log.lock().unwrap().clone()
    }

    /// Number of sends targeted at the default peer.
    pub fn sends_to_default(&self) -> usize {
        self.sent()
            .iter()
            .filter(|record| record.destination == Destination::DefaultPeer)
            .count()
    }

    /// Number of sends addressed to the given peer.
    pub fn sends_to_peer(&self, peer: PeerId) -> usize {
        self.sent()
            .iter()
            .filter(|record| record.destination == Destination::Peer(peer))
            .count()
    }

    /// How many times a listener has been registered on this channel.
    pub fn listener_registrations(&self) -> usize {
        self.listener_registrations.load(Ordering::SeqCst)
    }

    fn current_listener(&self) -> Option<CallbackListener> {
        self.listener.lock().unwrap().clone()
    }

    /// Deliver a raw message to the attached listener, as the host
    /// would on an incoming message. Returns the listener's keep-alive
    /// marker (`false` when it declined or none is attached).
    pub fn deliver(&self, message: Value, sender: SenderMetadata, respond: ReplyCallback) -> bool {
        match self.current_listener() {
            Some(listener) => listener(
                message,
                sender,
                Box::new(move |reply| respond(Some(reply))),
            ),
            None => false,
        }
    }

    fn run(&self, destination: Destination, message: Value, done: ReplyCallback) {
        self.log.lock().unwrap().push(SentMessage {
            destination,
            message: message.clone(),
        });

        let behavior = match destination {
            Destination::DefaultPeer => self.default_behavior.lock().unwrap().clone(),
            Destination::Peer(peer) => self
                .peer_behaviors
                .lock()
                .unwrap()
                .get(&peer)
                .cloned()
                .unwrap_or(CallbackBehavior::NoReply),
        };

        match behavior {
            CallbackBehavior::NoReply => drop(done),
            CallbackBehavior::Scripted(value) => done(Some(value)),
            CallbackBehavior::DeliverTo(peer_channel) => {
                let handled = peer_channel.deliver(message, SenderMetadata::default(), done);
                // When the peer declines, the respond callback was
                // dropped inside the listener, which reads as no
                // reply on the sending side.
                let _ = handled;
            }
        }
    }
}

impl CallbackChannel for MockCallbackChannel {
    fn send_to_default_peer(&self, message: Value, done: ReplyCallback) {
        self.run(Destination::DefaultPeer, message, done);
    }

    fn send_to_addressed_peer(&self, peer: PeerId, message: Value, done: ReplyCallback) {
        self.run(Destination::Peer(peer), message, done);
    }

    fn on_incoming_message(&self, listener: CallbackListener) {
        self.listener_registrations.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc;

    #[test]
    fn test_no_reply_drops_the_callback() {
        let channel = MockCallbackChannel::new();
        let (tx, rx) = mpsc::channel();
        channel.send_to_default_peer(
            json!({"m": 1}),
            Box::new(move |reply| {
                let _ = tx.send(reply);
            }),
        );
        // Callback dropped, nothing arrives.
        assert!(rx.try_recv().is_err());
        assert_eq!(channel.sends_to_default(), 1);
    }

    #[test]
    fn test_scripted_reply_invokes_the_callback() {
        let channel = MockCallbackChannel::new();
        channel.script_default(CallbackBehavior::Scripted(json!("pong")));

        let (tx, rx) = mpsc::channel();
        channel.send_to_default_peer(
            json!({"m": 2}),
            Box::new(move |reply| {
                let _ = tx.send(reply);
            }),
        );

        assert_eq!(rx.recv().unwrap(), Some(json!("pong")));
    }
}
