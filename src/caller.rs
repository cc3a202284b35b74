//! Caller-side proxy factory.
//!
//! [`make_remote_callable`] builds a callable stand-in for a function
//! registered in a peer process. Invoking the stand-in serializes a
//! call envelope, sends it over the transport, and interprets the raw
//! reply into either a value or one of the two error kinds.

use std::sync::Arc;

use serde_json::Value;

use wxrpc_protocol::{CallEnvelope, CallError, ReplyEnvelope, ReplyOutcome};

use crate::transport::{Destination, PeerId, Transport};

/// Options for [`make_remote_callable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// Peer to address. When absent the call targets the process's
    /// default peer (the background script).
    pub destination: Option<PeerId>,
}

impl CallOptions {
    /// Target a specific addressed peer (a tab's content script).
    pub fn addressed_to(peer: PeerId) -> Self {
        Self {
            destination: Some(peer),
        }
    }
}

/// Callable stand-in for a function living in a peer process.
///
/// Invocation has no side effects beyond the transport send.
#[derive(Clone)]
pub struct RemoteFunction {
    name: String,
    destination: Destination,
    transport: Arc<Transport>,
}

/// Build a proxy for the named remote function.
pub fn make_remote_callable(
    transport: Arc<Transport>,
    name: impl Into<String>,
    options: CallOptions,
) -> RemoteFunction {
    let destination = match options.destination {
        Some(peer) => Destination::Peer(peer),
        None => Destination::DefaultPeer,
    };
    RemoteFunction {
        name: name.into(),
        destination,
        transport,
    }
}

impl RemoteFunction {
    /// The remote function's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The endpoint this proxy targets.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Derived debugging name for the proxy. Cosmetic only; the
    /// protocol never uses it.
    pub fn display_name(&self) -> String {
        format!("{}_rpc", self.name)
    }

    /// Description of the side expected to answer, for error texts.
    fn other_side(&self) -> &'static str {
        match self.destination {
            Destination::DefaultPeer => "the background script",
            Destination::Peer(_) => "the tab's content script",
        }
    }

    /// Invoke the remote function with an ordered argument list.
    ///
    /// Interpretation of the raw reply, in order: no reply at all is
    /// an [`CallError::Rpc`] "no response"; a reply without the reply
    /// tag is an [`CallError::Rpc`] "interfering listener"; a
    /// dispatch error is an [`CallError::Rpc`] with the dispatcher's
    /// message verbatim; a handler failure is a [`CallError::Remote`]
    /// with the handler's message verbatim; otherwise the return
    /// value is the call's result.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let envelope = CallEnvelope::new(self.name.clone(), args);
        let raw = self.transport.send(self.destination, envelope.to_value()).await;

        let raw = match raw {
            Some(raw) => raw,
            None => {
                return Err(CallError::Rpc(format!(
                    "Got no response when trying to call '{}'. Did you enable RPC in {}?",
                    self.name,
                    self.other_side(),
                )));
            }
        };

        let reply = ReplyEnvelope::recognize(&raw).ok_or_else(|| {
            CallError::Rpc(format!(
                "Got a response from an interfering listener while calling '{}' in {}",
                self.name,
                self.other_side(),
            ))
        })?;

        match reply.outcome {
            ReplyOutcome::DispatchError(message) => Err(CallError::Rpc(message)),
            ReplyOutcome::ErrorMessage(message) => Err(CallError::Remote(message)),
            ReplyOutcome::ReturnValue(value) => Ok(value),
        }
    }

    /// Zero-argument sugar for [`RemoteFunction::call`].
    pub async fn call0(&self) -> Result<Value, CallError> {
        self.call(Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;

    fn proxy(options: CallOptions) -> RemoteFunction {
        let transport = Arc::new(Transport::promise(MockChannel::new()));
        make_remote_callable(transport, "remote_func", options)
    }

    #[test]
    fn test_display_name_has_rpc_suffix() {
        assert_eq!(proxy(CallOptions::default()).display_name(), "remote_func_rpc");
    }

    #[test]
    fn test_destination_resolution() {
        assert_eq!(
            proxy(CallOptions::default()).destination(),
            Destination::DefaultPeer
        );
        assert_eq!(
            proxy(CallOptions::addressed_to(PeerId(7))).destination(),
            Destination::Peer(PeerId(7))
        );
    }
}
