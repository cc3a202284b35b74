//! wxrpc - RPC over an extension's untyped messaging channel
//!
//! Turns a host environment's "send a message, maybe get one opaque
//! response back" primitive (e.g. between an extension's background
//! context and a tab's content context) into a correlated, typed-error
//! RPC mechanism:
//!
//! - [`make_remote_callable`] builds a caller-side proxy for a named
//!   remote function;
//! - [`expose_for_rpc`] registers handlers on the executing side and
//!   attaches the process-wide dispatcher exactly once;
//! - [`Transport`] reconciles the host's two delivery conventions
//!   (promise-returning vs. callback-based) behind one interface;
//! - [`RpcContext`] holds the per-process registry and idempotency
//!   flags, so nothing leaks across test cases or embedders.
//!
//! Callers see exactly two failure kinds: [`CallError::Rpc`] when the
//! protocol or transport broke, and [`CallError::Remote`] when the
//! remote function ran and failed.

pub mod caller;
pub mod context;
pub mod dispatcher;
pub mod mock;
pub mod transport;

pub use caller::{make_remote_callable, CallOptions, RemoteFunction};
pub use context::RpcContext;
pub use dispatcher::{expose_for_rpc, Functions, Handler};
pub use transport::{
    CallbackChannel, CallbackListener, ChannelError, Destination, HostCapabilities, HostEndpoints,
    PeerId, PromiseChannel, PromiseListener, ReplyCallback, RespondFn, SenderMetadata, Transport,
    TransportError, TransportFlavor,
};
pub use wxrpc_protocol::{CallEnvelope, CallError, ReplyEnvelope, ReplyOutcome, CALL_TAG, REPLY_TAG};
