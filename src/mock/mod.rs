//! Scriptable in-memory host channels.
//!
//! These stand in for the host messaging API so the protocol can be
//! exercised without a real extension runtime: replies can be
//! scripted per destination, every send is recorded, and two channels
//! can be linked so a call sent on one side reaches the dispatcher
//! listener attached on the other. Used by this crate's own tests and
//! exported for downstream test suites.

pub mod callback;
pub mod promise;

pub use callback::{CallbackBehavior, MockCallbackChannel};
pub use promise::{MockChannel, PromiseBehavior};

use serde_json::Value;

use crate::transport::Destination;

/// Record of one send observed by a mock channel.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Where the send was targeted.
    pub destination: Destination,
    /// The raw message handed to the host.
    pub message: Value,
}
