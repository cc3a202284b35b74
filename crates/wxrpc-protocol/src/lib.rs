//! wxrpc Protocol Types
//!
//! Defines the tagged call/reply envelopes exchanged over the host
//! messaging channel, plus the error taxonomy surfaced to callers.
//!
//! The channel itself is untyped and shared with unrelated listeners;
//! the tag sentinels are what distinguish this protocol's traffic from
//! everything else on the same channel.

pub mod envelope;
pub mod error;

pub use envelope::{CallEnvelope, ReplyEnvelope, ReplyOutcome, CALL_TAG, REPLY_TAG};
pub use error::CallError;
