//! Transport flavor adapter.
//!
//! The host messaging API comes in two calling conventions: a
//! promise-returning one (sends resolve to the single reply, the
//! incoming-message listener returns a future) and a callback-based
//! one (sends take a completion callback, the listener receives a
//! respond callback and returns a keep-alive marker). [`Transport`]
//! reconciles both behind a single interface; the proxy and the
//! dispatcher depend only on that interface, and the envelope formats
//! are identical regardless of flavor - only delivery mechanics
//! differ.
//!
//! The flavor is decided once per process (see
//! [`crate::RpcContext::resolve_flavor`]) and never changes for a
//! constructed transport.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use wxrpc_protocol::CallEnvelope;

use crate::context::RpcContext;
use crate::dispatcher;

/// Identifier of an addressed peer (e.g. a tab's content context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Logical remote endpoint a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The process's default peer (the background script).
    DefaultPeer,
    /// A specific addressed peer (a tab's content script).
    Peer(PeerId),
}

/// Opaque descriptor of a call's origin, attached to each invocation
/// on the executing side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SenderMetadata {
    /// Originating peer, when the host can identify it.
    pub peer: Option<PeerId>,
    /// Host-specific details about the sending context.
    pub details: Option<Value>,
}

/// Reply sink handed to callback-convention listeners. Dropping it
/// without calling is how "no reply" is signalled.
pub type RespondFn = Box<dyn FnOnce(Value) + Send>;

/// Completion callback for callback-convention sends. Receives the
/// single reply, or `None` when the peer produced nothing.
pub type ReplyCallback = Box<dyn FnOnce(Option<Value>) + Send>;

/// Listener shape for the promise convention: returns a future whose
/// value is the reply, or `None` to decline handling the message.
pub type PromiseListener =
    Arc<dyn Fn(Value, SenderMetadata) -> BoxFuture<'static, Option<Value>> + Send + Sync>;

/// Listener shape for the callback convention: invokes the respond
/// callback asynchronously and returns `true` as a keep-alive marker,
/// or returns `false` to decline handling the message.
pub type CallbackListener = Arc<dyn Fn(Value, SenderMetadata, RespondFn) -> bool + Send + Sync>;

/// Send failure at the host boundary. The caller-side adapter swallows
/// it into "no reply"; the underlying detail is intentionally dropped.
#[derive(Debug, Clone, Error)]
#[error("channel send failed: {0}")]
pub struct ChannelError(pub String);

/// Promise-convention host boundary (convention A). Provided by the
/// host environment; this crate never reimplements it.
#[async_trait]
pub trait PromiseChannel: Send + Sync {
    /// Send to the process's default peer and await the single reply.
    /// `Ok(None)` means the peer produced no reply at all.
    async fn send_to_default_peer(&self, message: Value) -> Result<Option<Value>, ChannelError>;

    /// Send to an addressed peer and await the single reply.
    async fn send_to_addressed_peer(
        &self,
        peer: PeerId,
        message: Value,
    ) -> Result<Option<Value>, ChannelError>;

    /// Register the process-wide incoming-message listener.
    fn on_incoming_message(&self, listener: PromiseListener);
}

/// Callback-convention host boundary (convention B).
pub trait CallbackChannel: Send + Sync {
    /// Send to the process's default peer; the completion callback
    /// receives the single reply.
    fn send_to_default_peer(&self, message: Value, done: ReplyCallback);

    /// Send to an addressed peer; the completion callback receives
    /// the single reply.
    fn send_to_addressed_peer(&self, peer: PeerId, message: Value, done: ReplyCallback);

    /// Register the process-wide incoming-message listener.
    fn on_incoming_message(&self, listener: CallbackListener);
}

/// Which host delivery convention is in effect for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFlavor {
    /// Convention A: sends and listeners are promise-returning.
    Promise,
    /// Convention B: sends and listeners are callback-based.
    Callback,
}

/// Environment signal used to pick the flavor: which host API family
/// is present in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCapabilities {
    /// The promise-returning messaging family is available.
    pub promise_messaging: bool,
    /// The callback-based messaging family is available.
    pub callback_messaging: bool,
}

impl TransportFlavor {
    /// Pick a flavor from the environment signal. The promise family
    /// wins when both are present; in every other case the callback
    /// family is assumed, since hosts without the promise API only
    /// offer callback-based messaging. [`Transport::select`] still
    /// fails when no endpoint matches the assumed flavor.
    pub fn detect(caps: &HostCapabilities) -> TransportFlavor {
        if caps.promise_messaging {
            TransportFlavor::Promise
        } else {
            TransportFlavor::Callback
        }
    }
}

impl fmt::Display for TransportFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promise => write!(f, "promise"),
            Self::Callback => write!(f, "callback"),
        }
    }
}

/// Host endpoints available to [`Transport::select`].
#[derive(Clone, Default)]
pub struct HostEndpoints {
    /// Promise-convention endpoint, when the host exposes one.
    pub promise: Option<Arc<dyn PromiseChannel>>,
    /// Callback-convention endpoint, when the host exposes one.
    pub callback: Option<Arc<dyn CallbackChannel>>,
}

/// Failure to construct a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The resolved flavor has no matching host endpoint.
    #[error("no {0}-convention endpoint was provided for the resolved transport flavor")]
    FlavorUnavailable(TransportFlavor),
}

/// The single transport interface the proxy factory and dispatcher
/// depend on. Constructed once per process; the flavor of a
/// constructed transport never changes.
#[derive(Clone)]
pub enum Transport {
    /// Convention A endpoint.
    Promise(Arc<dyn PromiseChannel>),
    /// Convention B endpoint.
    Callback(Arc<dyn CallbackChannel>),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Promise(_) => f.write_str("Transport::Promise"),
            Transport::Callback(_) => f.write_str("Transport::Callback"),
        }
    }
}

impl Transport {
    /// Wrap a promise-convention host endpoint.
    pub fn promise(host: Arc<dyn PromiseChannel>) -> Self {
        Transport::Promise(host)
    }

    /// Wrap a callback-convention host endpoint.
    pub fn callback(host: Arc<dyn CallbackChannel>) -> Self {
        Transport::Callback(host)
    }

    /// Resolve the flavor through the context's cache (probing the
    /// environment signal at most once) and wrap the matching
    /// endpoint.
    pub fn select(
        ctx: &RpcContext,
        caps: &HostCapabilities,
        endpoints: HostEndpoints,
    ) -> Result<Transport, TransportError> {
        let flavor = ctx.resolve_flavor(|| TransportFlavor::detect(caps));
        match flavor {
            TransportFlavor::Promise => endpoints
                .promise
                .map(Transport::promise)
                .ok_or(TransportError::FlavorUnavailable(flavor)),
            TransportFlavor::Callback => endpoints
                .callback
                .map(Transport::callback)
                .ok_or(TransportError::FlavorUnavailable(flavor)),
        }
    }

    /// The delivery convention this transport uses.
    pub fn flavor(&self) -> TransportFlavor {
        match self {
            Transport::Promise(_) => TransportFlavor::Promise,
            Transport::Callback(_) => TransportFlavor::Callback,
        }
    }

    /// Send a raw message and await the single reply.
    ///
    /// Every transport-level failure (send error, dropped completion
    /// callback, torn-down peer) is reported as `None`, identical to
    /// "no reply"; the caller turns that into the generic "no
    /// response" error.
    pub async fn send(&self, destination: Destination, message: Value) -> Option<Value> {
        match self {
            Transport::Promise(host) => {
                let sent = match destination {
                    Destination::DefaultPeer => host.send_to_default_peer(message).await,
                    Destination::Peer(peer) => host.send_to_addressed_peer(peer, message).await,
                };
                sent.unwrap_or(None)
            }
            Transport::Callback(host) => {
                let (tx, rx) = oneshot::channel();
                let done: ReplyCallback = Box::new(move |reply| {
                    let _ = tx.send(reply);
                });
                match destination {
                    Destination::DefaultPeer => host.send_to_default_peer(message, done),
                    Destination::Peer(peer) => host.send_to_addressed_peer(peer, message, done),
                }
                // A host that drops the callback without calling it
                // reads as "no reply".
                rx.await.unwrap_or(None)
            }
        }
    }

    /// Attach the dispatcher listener for the given context to the
    /// incoming-message event, using whichever delivery mechanism the
    /// flavor requires.
    pub(crate) fn attach(&self, ctx: Arc<RpcContext>) {
        match self {
            Transport::Promise(host) => {
                host.on_incoming_message(Arc::new(move |message, sender| {
                    let ctx = ctx.clone();
                    Box::pin(dispatcher::handle_incoming(ctx, message, sender))
                }));
            }
            Transport::Callback(host) => {
                host.on_incoming_message(Arc::new(move |message, sender, respond| {
                    if !CallEnvelope::is_tagged(&message) {
                        // Not ours; let other listeners handle it.
                        return false;
                    }
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        if let Some(reply) =
                            dispatcher::handle_incoming(ctx, message, sender).await
                        {
                            respond(reply);
                        }
                    });
                    // Keep-alive marker: the respond callback will be
                    // invoked asynchronously.
                    true
                }));
            }
        }
        debug!(flavor = %self.flavor(), "rpc dispatcher listener attached");
    }
}
