//! Call and reply envelopes.
//!
//! Both envelopes are plain JSON records. A call carries the function
//! name and an ordered argument list; a reply carries exactly one of
//! three outcome shapes. Presence of the reply tag is what proves a
//! reply came from this protocol's dispatcher rather than from some
//! unrelated listener answering on the same channel.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tag sentinel marking a call envelope.
pub const CALL_TAG: &str = "__RPC_CALL__";

/// Tag sentinel marking a reply envelope.
pub const REPLY_TAG: &str = "__RPC_RESPONSE__";

/// Call envelope sent from the calling side to the executing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    /// Always [`CALL_TAG`].
    pub tag: String,
    /// Name of the registered function to invoke.
    #[serde(rename = "functionName")]
    pub function_name: String,
    /// Ordered call arguments; present even when empty.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallEnvelope {
    /// Create a call envelope for the given function and arguments.
    pub fn new(function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            tag: CALL_TAG.to_string(),
            function_name: function_name.into(),
            args,
        }
    }

    /// Cheap synchronous check whether a raw message carries the call tag.
    pub fn is_tagged(message: &Value) -> bool {
        message.get("tag").and_then(Value::as_str) == Some(CALL_TAG)
    }

    /// Recognize a raw message as a call envelope.
    ///
    /// Returns `None` when the message does not carry the call tag at
    /// all; it belongs to some other listener and must be ignored.
    /// Returns `Some(Err(_))` when the message claims to be a call but
    /// cannot be decoded.
    pub fn recognize(message: &Value) -> Option<Result<CallEnvelope, String>> {
        if !Self::is_tagged(message) {
            return None;
        }
        Some(
            serde_json::from_value(message.clone())
                .map_err(|err| format!("malformed RPC call envelope: {err}")),
        )
    }

    /// Serialize into the raw wire shape.
    pub fn to_value(&self) -> Value {
        json!({
            "tag": CALL_TAG,
            "functionName": self.function_name,
            "args": self.args,
        })
    }
}

/// Outcome carried by a reply envelope. Exactly one of the three
/// shapes is present on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// The function ran to completion; this is its return value.
    ReturnValue(Value),
    /// The function ran and failed; the message is passed through
    /// verbatim.
    ErrorMessage(String),
    /// The dispatcher could not invoke the function at all (unknown
    /// name, undecodable call).
    DispatchError(String),
}

/// Reply envelope sent from the executing side back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEnvelope {
    /// The single outcome of the call.
    pub outcome: ReplyOutcome,
}

impl ReplyEnvelope {
    /// Successful reply carrying the function's return value.
    pub fn success(value: Value) -> Self {
        Self {
            outcome: ReplyOutcome::ReturnValue(value),
        }
    }

    /// The function ran and failed with this message.
    pub fn remote_error(message: impl Into<String>) -> Self {
        Self {
            outcome: ReplyOutcome::ErrorMessage(message.into()),
        }
    }

    /// The dispatcher itself could not invoke the function.
    pub fn dispatch_error(message: impl Into<String>) -> Self {
        Self {
            outcome: ReplyOutcome::DispatchError(message.into()),
        }
    }

    /// Recognize a raw reply as a reply envelope.
    ///
    /// Returns `None` unless the reply tag is present; an untagged
    /// value (including null and non-objects) must never be treated
    /// as a valid reply. A tagged reply with none of the outcome keys
    /// is a success whose return value was dropped by the host, and
    /// reads as `ReturnValue(Null)`.
    pub fn recognize(message: &Value) -> Option<ReplyEnvelope> {
        let fields = message.as_object()?;
        if fields.get("tag").and_then(Value::as_str) != Some(REPLY_TAG) {
            return None;
        }
        let outcome = if let Some(message) = fields.get("dispatchError").and_then(Value::as_str) {
            ReplyOutcome::DispatchError(message.to_string())
        } else if let Some(message) = fields.get("errorMessage").and_then(Value::as_str) {
            ReplyOutcome::ErrorMessage(message.to_string())
        } else {
            ReplyOutcome::ReturnValue(fields.get("returnValue").cloned().unwrap_or(Value::Null))
        };
        Some(ReplyEnvelope { outcome })
    }

    /// Serialize into the raw wire shape.
    pub fn to_value(&self) -> Value {
        match &self.outcome {
            ReplyOutcome::ReturnValue(value) => json!({
                "tag": REPLY_TAG,
                "returnValue": value,
            }),
            ReplyOutcome::ErrorMessage(message) => json!({
                "tag": REPLY_TAG,
                "errorMessage": message,
            }),
            ReplyOutcome::DispatchError(message) => json!({
                "tag": REPLY_TAG,
                "dispatchError": message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_envelope_wire_shape() {
        let call = CallEnvelope::new("sum", vec![json!(1), json!(2)]);
        let wire = call.to_value();

        assert_eq!(wire["tag"], CALL_TAG);
        assert_eq!(wire["functionName"], "sum");
        assert_eq!(wire["args"], json!([1, 2]));
    }

    #[test]
    fn test_call_envelope_args_always_present() {
        let wire = CallEnvelope::new("ping", Vec::new()).to_value();
        assert_eq!(wire["args"], json!([]));
    }

    #[test]
    fn test_recognize_untagged_call_is_none() {
        assert!(CallEnvelope::recognize(&json!({"hello": 1})).is_none());
        assert!(CallEnvelope::recognize(&json!(null)).is_none());
        assert!(CallEnvelope::recognize(&json!("text")).is_none());
    }

    #[test]
    fn test_recognize_call_defaults_missing_args() {
        let wire = json!({"tag": CALL_TAG, "functionName": "ping"});
        let call = CallEnvelope::recognize(&wire).unwrap().unwrap();
        assert_eq!(call.function_name, "ping");
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_recognize_tagged_but_malformed_call() {
        let wire = json!({"tag": CALL_TAG, "args": [1]});
        let result = CallEnvelope::recognize(&wire).unwrap();
        assert!(result.unwrap_err().contains("malformed RPC call envelope"));
    }

    #[test]
    fn test_reply_outcome_shapes() {
        let ok = ReplyEnvelope::success(json!("v")).to_value();
        assert_eq!(ok["tag"], REPLY_TAG);
        assert_eq!(ok["returnValue"], "v");
        assert!(ok.get("errorMessage").is_none());
        assert!(ok.get("dispatchError").is_none());

        let remote = ReplyEnvelope::remote_error("boom").to_value();
        assert_eq!(remote["errorMessage"], "boom");
        assert!(remote.get("returnValue").is_none());

        let dispatch = ReplyEnvelope::dispatch_error("no such function").to_value();
        assert_eq!(dispatch["dispatchError"], "no such function");
    }

    #[test]
    fn test_recognize_reply_requires_tag() {
        assert!(ReplyEnvelope::recognize(&json!(null)).is_none());
        assert!(ReplyEnvelope::recognize(&json!("unrelated")).is_none());
        assert!(ReplyEnvelope::recognize(&json!({"returnValue": 1})).is_none());
        assert!(ReplyEnvelope::recognize(&json!({"tag": "other", "returnValue": 1})).is_none());
    }

    #[test]
    fn test_recognize_reply_roundtrip() {
        let reply = ReplyEnvelope::remote_error("failed");
        let parsed = ReplyEnvelope::recognize(&reply.to_value()).unwrap();
        assert_eq!(parsed, reply);
    }

    #[test]
    fn test_recognize_tagged_reply_without_outcome_is_null_success() {
        let wire = json!({"tag": REPLY_TAG});
        let parsed = ReplyEnvelope::recognize(&wire).unwrap();
        assert_eq!(parsed.outcome, ReplyOutcome::ReturnValue(Value::Null));
    }

    #[test]
    fn test_dispatch_error_takes_precedence_over_other_keys() {
        let wire = json!({
            "tag": REPLY_TAG,
            "dispatchError": "unknown",
            "errorMessage": "ignored",
            "returnValue": "ignored",
        });
        let parsed = ReplyEnvelope::recognize(&wire).unwrap();
        assert_eq!(parsed.outcome, ReplyOutcome::DispatchError("unknown".to_string()));
    }
}
