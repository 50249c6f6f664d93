// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the SkySunny host bridge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key-value payload sent to the host alongside an action name.
pub type Payload = Map<String, Value>;

/// Field the bridge adds to outgoing payloads so the host can echo it back.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Unique identifier for one in-flight host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id echoed back by the host. Returns `None` for anything that
    /// is not a UUID string.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request as handed to a host transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequest {
    pub id: RequestId,
    pub action: String,
    pub payload: Payload,
}

/// Lifecycle of a pending request. Exactly one `Pending -> Settled`
/// transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Pending,
    Settled,
}

/// Which passive transport delivered a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyChannel {
    /// Structured `<namespace>:reply` event carrying a `detail` mapping.
    Event,
    /// Raw cross-context message tagged with the namespace `source` marker.
    Message,
    /// Global callback slot invoked directly by the host.
    Callback,
}

impl std::fmt::Display for ReplyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Message => "message",
            Self::Callback => "callback",
        };
        f.write_str(name)
    }
}

/// Normalized view of whatever a reply transport produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Action the reply answers (`action`, falling back to `type`).
    pub action: Option<String>,
    pub ok: bool,
    /// Failure reason; only meaningful when `ok` is false.
    pub error: Option<String>,
    /// Data handed to the caller on success.
    pub data: Value,
    /// Correlation id echoed by hosts that support it.
    pub request_id: Option<RequestId>,
}

impl Reply {
    /// Whether this reply answers `action` (exact match or `<action>_REPLY`).
    pub fn answers(&self, action: &str) -> bool {
        match self.action.as_deref() {
            Some(name) => {
                name == action
                    || name
                        .strip_suffix("_REPLY")
                        .is_some_and(|base| base == action)
            }
            None => false,
        }
    }
}

/// Outcome of handing a raw reply to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The reply settled the given request.
    Settled(RequestId),
    /// No pending request accepted the reply.
    Unmatched,
    /// The reply was addressed to a different namespace or event name.
    Foreign,
}

/// How a host transport dispatches requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Real host call gate inside the native container.
    HostGate,
    /// No host at all: replies are fabricated locally.
    Simulated,
    /// Embedded in the native container, but the call gate is missing.
    Detached,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HostGate => "host-gate",
            Self::Simulated => "simulated",
            Self::Detached => "detached",
        };
        f.write_str(name)
    }
}

/// JavaScript truthiness, which is how the host contract defines `ok`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(action: Option<&str>) -> Reply {
        Reply {
            action: action.map(str::to_string),
            ok: true,
            error: None,
            data: Value::Null,
            request_id: None,
        }
    }

    #[test]
    fn reply_answers_exact_and_suffixed_action() {
        assert!(reply(Some("UPDATE_PAYMENT")).answers("UPDATE_PAYMENT"));
        assert!(reply(Some("UPDATE_PAYMENT_REPLY")).answers("UPDATE_PAYMENT"));
        assert!(!reply(Some("UPDATE_PAYMENT_REPLY_REPLY")).answers("UPDATE_PAYMENT"));
        assert!(!reply(Some("REQUEST_PAYMENT")).answers("UPDATE_PAYMENT"));
        assert!(!reply(None).answers("UPDATE_PAYMENT"));
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("false")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn request_id_parse_rejects_garbage() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("order-123"), None);
    }
}
