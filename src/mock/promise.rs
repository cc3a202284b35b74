//! Promise-convention mock channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{
    ChannelError, Destination, PeerId, PromiseChannel, PromiseListener, SenderMetadata,
};

use super::SentMessage;

/// Scripted behavior for one destination of a [`MockChannel`].
#[derive(Clone)]
pub enum PromiseBehavior {
    /// The host resolves with no value at all (e.g. the peer was torn
    /// down before answering).
    NoReply,
    /// The host-level send fails outright.
    SendFailure,
    /// Some listener answers with exactly this value.
    Scripted(Value),
    /// Deliver the message to the listener attached on the given
    /// channel, as if it were the peer process.
    DeliverTo(Arc<MockChannel>),
}

/// Scriptable in-memory implementation of the promise-convention host
/// boundary.
pub struct MockChannel {
    default_behavior: Mutex<PromiseBehavior>,
    peer_behaviors: Mutex<HashMap<PeerId, PromiseBehavior>>,
    listener: Mutex<Option<PromiseListener>>,
    listener_registrations: AtomicUsize,
    log: Mutex<Vec<SentMessage>>,
}

impl MockChannel {
    /// New channel; every destination produces no reply until
    /// scripted otherwise.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            default_behavior: Mutex::new(PromiseBehavior::NoReply),
            peer_behaviors: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
            listener_registrations: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Script the behavior for sends to the default peer.
    pub fn script_default(&self, behavior: PromiseBehavior) {
        *self.default_behavior.lock().unwrap() = behavior;
    }

    /// Script the behavior for sends addressed to a specific peer.
    pub fn script_peer(&self, peer: PeerId, behavior: PromiseBehavior) {
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

    fn current_listener(&self) -> Option<PromiseListener> {
        self.listener.lock().unwrap().clone()
    }

    /// Deliver a raw message to the attached listener, as the host
    /// would on an incoming message. `None` means the listener
    /// declined (or none is attached).
    pub async fn deliver(&self, message: Value, sender: SenderMetadata) -> Option<Value> {
        match self.current_listener() {
            Some(listener) => listener(message, sender).await,
            None => None,
        }
    }

    async fn run(
        &self,
        destination: Destination,
        message: Value,
    ) -> Result<Option<Value>, ChannelError> {
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
                .unwrap_or(PromiseBehavior::NoReply),
        };

        match behavior {
            PromiseBehavior::NoReply => Ok(None),
            PromiseBehavior::SendFailure => {
                Err(ChannelError("scripted send failure".to_string()))
            }
            PromiseBehavior::Scripted(value) => Ok(Some(value)),
            PromiseBehavior::DeliverTo(peer_channel) => {
                Ok(peer_channel.deliver(message, SenderMetadata::default()).await)
            }
        }
    }
}

#[async_trait]
impl PromiseChannel for MockChannel {
    async fn send_to_default_peer(&self, message: Value) -> Result<Option<Value>, ChannelError> {
        self.run(Destination::DefaultPeer, message).await
    }

    async fn send_to_addressed_peer(
        &self,
        peer: PeerId,
        message: Value,
    ) -> Result<Option<Value>, ChannelError> {
        self.run(Destination::Peer(peer), message).await
    }

    fn on_incoming_message(&self, listener: PromiseListener) {
        self.listener_registrations.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
    }
}
