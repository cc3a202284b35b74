//! Caller-visible error taxonomy.

use thiserror::Error;

/// Error surfaced by a remote call.
///
/// The discriminant separates "the protocol or transport broke" from
/// "the remote function ran and failed", so failure handling does not
/// have to rely on exception-type identity or message parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Protocol- or transport-level failure: no response was obtained,
    /// an interfering listener answered first, or the dispatcher could
    /// not locate the requested function.
    #[error("{0}")]
    Rpc(String),

    /// The remote function executed and failed. The message is the
    /// handler's failure description, passed through verbatim.
    #[error("{0}")]
    Remote(String),
}

impl CallError {
    /// The failure message, regardless of kind.
    pub fn message(&self) -> &str {
        match self {
            Self::Rpc(message) | Self::Remote(message) => message,
        }
    }

    /// True for protocol/transport-level failures.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    /// True when the remote function ran and failed.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
