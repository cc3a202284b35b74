//! Callee-side registry and dispatcher.
//!
//! [`expose_for_rpc`] merges named handlers into the process-wide
//! registry and attaches the dispatcher listener to the transport
//! exactly once per context. The dispatcher recognizes tagged call
//! envelopes, invokes the registered handler with the sender
//! metadata, and converts every failure path into a structured reply;
//! nothing escapes into the host's event machinery.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error};

use wxrpc_protocol::{CallEnvelope, ReplyEnvelope};

use crate::context::RpcContext;
use crate::transport::{SenderMetadata, Transport};

/// Type-erased registered handler.
///
/// Handlers always take the sender metadata and the ordered argument
/// list. A returned error becomes the reply's `errorMessage`,
/// verbatim.
pub type Handler =
    Arc<dyn Fn(SenderMetadata, Vec<Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Named handlers to expose, merged into the context registry by
/// [`expose_for_rpc`].
#[derive(Default)]
pub struct Functions {
    entries: HashMap<String, Handler>,
}

impl Functions {
    /// Start an empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metadata-aware handler under the given name.
    /// Registering a name twice keeps the later handler.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(SenderMetadata, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |sender, args| handler(sender, args).boxed());
        self.entries.insert(name.into(), handler);
        self
    }

    /// Register a handler that does not care who is calling; the
    /// wrapper drops the sender metadata before forwarding, so the
    /// handler keeps a plain signature.
    pub fn register_plain<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.register(name, move |_sender, args| handler(args))
    }

    /// Number of handlers in this set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no handlers have been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expose functions for RPC on this context.
///
/// All handlers are merged into the process-wide registry,
/// overwriting any prior entry with the same name (last write wins).
/// The first call per context also attaches the dispatcher listener
/// to the transport's incoming-message event; later calls only add
/// entries and never re-attach.
pub fn expose_for_rpc(ctx: &Arc<RpcContext>, transport: &Transport, functions: Functions) {
    ctx.merge_handlers(functions.entries);
    if ctx.mark_dispatcher_attached() {
        transport.attach(ctx.clone());
    }
}

/// Handle one incoming raw message.
///
/// Returns `None` when the message is not a call envelope, leaving it
/// to other listeners on the shared channel. Otherwise every failure
/// path is converted into a reply envelope: an undecodable or
/// unknown-function call becomes a dispatch error, and a handler
/// failure (returned error or panic) becomes an error message reply.
pub(crate) async fn handle_incoming(
    ctx: Arc<RpcContext>,
    message: Value,
    sender: SenderMetadata,
) -> Option<Value> {
    let call = match CallEnvelope::recognize(&message)? {
        Ok(call) => call,
        Err(reason) => return Some(ReplyEnvelope::dispatch_error(reason).to_value()),
    };

    let Some(handler) = ctx.lookup(&call.function_name) else {
        error!(function = %call.function_name, "received RPC for unknown function");
        return Some(
            ReplyEnvelope::dispatch_error(format!(
                "No such function registered for RPC: {}",
                call.function_name
            ))
            .to_value(),
        );
    };

    debug!(function = %call.function_name, args = call.args.len(), "dispatching RPC call");
    // The invocation itself runs inside the caught future, so a panic
    // while the handler builds its future is contained the same as a
    // panic while it runs.
    let args = call.args;
    let outcome = AssertUnwindSafe(async move { handler(sender, args).await })
        .catch_unwind()
        .await;

    let reply = match outcome {
        Ok(Ok(value)) => ReplyEnvelope::success(value),
        Ok(Err(message)) => ReplyEnvelope::remote_error(message),
        Err(panic) => ReplyEnvelope::remote_error(panic_message(panic)),
    };
    Some(reply.to_value())
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
