// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transports backed by the native container.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::types::{HostRequest, Payload, TransportKind};

use crate::channel::ReplySink;
use crate::traits::{HostGate, HostTransport, PostMessage};

/// What the runtime exposes about its surroundings.
#[derive(Clone, Default)]
pub struct HostEnvironment {
    /// The host call gate, if the container installed one.
    pub gate: Option<HostGate>,
    /// Whether the embedding marker object is present.
    pub embedded: bool,
    /// The marker's raw `postMessage`, when it has one.
    pub post_message: Option<PostMessage>,
}

impl HostEnvironment {
    /// Plain browser: no gate, no marker.
    pub fn standalone() -> Self {
        Self::default()
    }

    /// Inside the container with a working call gate.
    pub fn hosted(gate: HostGate) -> Self {
        Self {
            gate: Some(gate),
            embedded: true,
            post_message: None,
        }
    }

    pub fn with_post_message(mut self, post: PostMessage) -> Self {
        self.embedded = true;
        self.post_message = Some(post);
        self
    }

    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }
}

impl std::fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("gate", &self.gate.is_some())
            .field("embedded", &self.embedded)
            .field("post_message", &self.post_message.is_some())
            .finish()
    }
}

/// Dispatches through the host call gate.
pub struct HostGateTransport {
    gate: HostGate,
}

impl HostGateTransport {
    pub fn new(gate: HostGate) -> Self {
        Self { gate }
    }
}

impl HostTransport for HostGateTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::HostGate
    }

    fn dispatch(&self, request: &HostRequest, _replies: &ReplySink) -> Result<()> {
        debug!(request_id = %request.id, action = %request.action, "invoking host call gate");
        (self.gate)(&request.action, &request.payload);
        Ok(())
    }

    fn notify(&self, action: &str, payload: &Payload) -> Result<()> {
        (self.gate)(action, payload);
        Ok(())
    }
}

/// Inside the container but without a call gate.
///
/// Correlated requests fail with `HostUnavailable` rather than falling back to
/// fabricated data. Notifications still go out through the marker's
/// `postMessage` when there is one.
pub struct DetachedTransport {
    post_message: Option<PostMessage>,
}

impl DetachedTransport {
    pub fn new(post_message: Option<PostMessage>) -> Self {
        Self { post_message }
    }
}

impl HostTransport for DetachedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Detached
    }

    fn dispatch(&self, request: &HostRequest, _replies: &ReplySink) -> Result<()> {
        warn!(action = %request.action, "host call gate missing inside the container");
        Err(SkysunnyError::HostUnavailable(format!(
            "no call gate for {}",
            request.action
        )))
    }

    fn notify(&self, action: &str, payload: &Payload) -> Result<()> {
        let Some(post) = &self.post_message else {
            return Err(SkysunnyError::HostUnavailable(format!("no call gate for {action}")));
        };
        let mut message = Map::new();
        message.insert("action".into(), Value::String(action.to_string()));
        message.insert("payload".into(), Value::Object(payload.clone()));
        let text = serde_json::to_string(&message)?;
        debug!(action, "posting notification through the container");
        post(&text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use skysunny_core::config::BridgeConfig;
    use skysunny_core::types::Delivery;

    use crate::channel::BridgeChannel;

    type Calls = Arc<Mutex<Vec<(String, Payload)>>>;

    fn recording_gate() -> (HostGate, Calls) {
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let gate: HostGate = Arc::new(move |action: &str, payload: &Payload| {
            sink.lock()
                .expect("lock")
                .push((action.to_string(), payload.clone()));
        });
        (gate, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn gate_receives_action_and_payload_once() {
        let (gate, calls) = recording_gate();
        let channel = BridgeChannel::new(
            BridgeConfig::default(),
            Arc::new(HostGateTransport::new(gate)),
        );

        let mut payload = Payload::new();
        payload.insert("orderNumber".into(), json!("A1"));
        let pending = channel
            .call("GET_PAYMENT_DETAIL", payload, None)
            .expect("call");

        {
            let calls = calls.lock().expect("lock");
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].0, "GET_PAYMENT_DETAIL");
            assert_eq!(calls[0].1.get("orderNumber"), Some(&json!("A1")));
        }

        let reply = json!({
            "detail": { "action": "GET_PAYMENT_DETAIL_REPLY", "ok": true, "data": { "status": "pending" } }
        });
        assert_eq!(
            channel.replies().deliver_callback(&reply).expect("deliver"),
            Delivery::Settled(pending.id())
        );
        assert_eq!(pending.wait().await.expect("data"), json!({ "status": "pending" }));
    }

    #[test]
    fn detached_notify_posts_json_through_the_marker() {
        let posted: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&posted);
        let post: PostMessage = Arc::new(move |text: &str| {
            sink.lock().expect("lock").push(text.to_string());
        });
        let transport = DetachedTransport::new(Some(post));

        let mut payload = Payload::new();
        payload.insert("tab".into(), json!("ticket"));
        transport.notify("GO_HOME", &payload).expect("notify");

        let posted = posted.lock().expect("lock");
        let message: Value = serde_json::from_str(&posted[0]).expect("json");
        assert_eq!(message, json!({ "action": "GO_HOME", "payload": { "tab": "ticket" } }));
    }

    #[test]
    fn detached_without_marker_post_is_unavailable() {
        let transport = DetachedTransport::new(None);
        assert!(matches!(
            transport.notify("GO_HOME", &Payload::new()),
            Err(SkysunnyError::HostUnavailable(_))
        ));
    }
}
