// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated host for standalone browser/CI runs where no native container is
// present.
//
// Every request is answered after a fixed latency with obviously fake data
// (`mock_order_<millis>`, "테스트 상품", 10000 won) so the payment pages stay
// exercisable. Replies go back through the normal reply path and echo the
// request id, exactly as a cooperating host would.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::types::{Delivery, HostRequest, Payload, REQUEST_ID_FIELD, TransportKind, is_truthy};

use crate::channel::ReplySink;
use crate::traits::HostTransport;

const MOCK_AMOUNT: i64 = 10_000;
const MOCK_PRODUCT_NAME: &str = "테스트 상품";
const MOCK_STORE_NAME: &str = "테스트 매장";
const MOCK_USER_ID: &str = "test_user";

/// Answers every request locally with fabricated data.
pub struct SimulatedTransport {
    latency: Duration,
}

impl SimulatedTransport {
    pub fn new(latency: Duration) -> Self {
        warn!(
            latency_ms = crate::channel::millis(latency),
            "no host detected: bridge replies will be simulated with fake data"
        );
        Self { latency }
    }
}

impl HostTransport for SimulatedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Simulated
    }

    fn dispatch(&self, request: &HostRequest, replies: &ReplySink) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            SkysunnyError::HostUnavailable("simulated host needs a running tokio runtime".into())
        })?;

        info!(action = %request.action, "browser environment: simulating host reply");
        let request = request.clone();
        let replies = replies.clone();
        let latency = self.latency;

        runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            let reply = mock_reply(&request.action, &request.payload, Utc::now());
            debug!(action = %request.action, %reply, "simulated reply");
            match replies.deliver_callback(&reply) {
                Ok(Delivery::Settled(_)) => {}
                Ok(_) => debug!(action = %request.action, "simulated reply had no waiting request"),
                Err(e) => warn!(action = %request.action, error = %e, "simulated reply rejected"),
            }
        });
        Ok(())
    }

    fn notify(&self, action: &str, payload: &Payload) -> Result<()> {
        info!(action, ?payload, "browser environment: dropping host notification");
        Ok(())
    }
}

/// Build the fabricated reply for `action`.
///
/// The reply carries `action`, `ok: true`, the request id (when the payload
/// had one) and the action-specific `data`; order actions also repeat
/// `orderNumber` at the top level.
pub fn mock_reply(action: &str, payload: &Payload, now: DateTime<Utc>) -> Value {
    let millis = now.timestamp_millis();
    let iso = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let order_number = payload.get("orderNumber").cloned().unwrap_or(Value::Null);

    let (order_number, data) = match action {
        "REQUEST_DRAFT" => {
            let draft_number = Value::String(format!("mock_order_{millis}"));
            let data = json!({
                "orderNumber": draft_number,
                "amount": or_default(payload, "finalAmount", json!(MOCK_AMOUNT)),
                "productName": or_default(payload, "productName", json!(MOCK_PRODUCT_NAME)),
                "storeName": or_default(payload, "storeName", json!(MOCK_STORE_NAME)),
                "userId": or_default(payload, "userId", json!(MOCK_USER_ID)),
                "timestamp": millis,
            });
            (Some(draft_number), data)
        }
        "GET_PAYMENT_DETAIL" => (
            Some(order_number.clone()),
            json!({
                "orderNumber": order_number,
                "amount": MOCK_AMOUNT,
                "productName": MOCK_PRODUCT_NAME,
                "storeName": MOCK_STORE_NAME,
                "status": "pending",
                "createdAt": iso,
            }),
        ),
        "UPDATE_PAYMENT" => (
            Some(order_number.clone()),
            json!({
                "orderNumber": order_number,
                "updated": true,
                "timestamp": millis,
            }),
        ),
        "REQUEST_PAYMENT" => (
            Some(order_number.clone()),
            json!({
                "orderNumber": order_number,
                "paymentKey": format!("mock_payment_{millis}"),
                "status": "completed",
                "paidAt": iso,
            }),
        ),
        "CHECK_PAYMENT_COMPLETE" => (
            Some(order_number.clone()),
            json!({
                "orderNumber": order_number,
                "status": "completed",
                "amount": MOCK_AMOUNT,
                "productName": MOCK_PRODUCT_NAME,
                "storeName": MOCK_STORE_NAME,
                "paidAt": iso,
            }),
        ),
        other => (None, json!({ "message": format!("Mock response for {other}") })),
    };

    let mut reply = Map::new();
    reply.insert("action".into(), Value::String(action.to_string()));
    reply.insert("ok".into(), Value::Bool(true));
    if let Some(number) = order_number {
        reply.insert("orderNumber".into(), number);
    }
    if let Some(id) = payload.get(REQUEST_ID_FIELD) {
        reply.insert(REQUEST_ID_FIELD.into(), id.clone());
    }
    reply.insert("data".into(), data);
    Value::Object(reply)
}

/// Caller-supplied value unless it is missing or falsy.
fn or_default(payload: &Payload, key: &str, default: Value) -> Value {
    payload
        .get(key)
        .filter(|v| is_truthy(v))
        .cloned()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use skysunny_core::config::BridgeConfig;
    use tokio::time::Instant;

    use crate::channel::BridgeChannel;

    fn fixed_now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).single().expect("timestamp")
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().expect("object payload")
    }

    fn simulated_channel() -> BridgeChannel {
        let config = BridgeConfig::default();
        let transport = SimulatedTransport::new(config.simulated_latency());
        BridgeChannel::new(config, Arc::new(transport))
    }

    #[test]
    fn draft_uses_caller_values_or_placeholders() {
        let reply = mock_reply(
            "REQUEST_DRAFT",
            &payload(json!({ "finalAmount": 0, "productName": "1일권", "userId": "" })),
            fixed_now(),
        );
        assert_eq!(reply["orderNumber"], json!("mock_order_1700000000123"));
        let data = &reply["data"];
        assert_eq!(data["orderNumber"], json!("mock_order_1700000000123"));
        assert_eq!(data["amount"], json!(10_000));
        assert_eq!(data["productName"], json!("1일권"));
        assert_eq!(data["storeName"], json!("테스트 매장"));
        assert_eq!(data["userId"], json!("test_user"));
        assert_eq!(data["timestamp"], json!(1_700_000_000_123_i64));
    }

    #[test]
    fn payment_actions_echo_the_order_number() {
        let request = payload(json!({ "orderNumber": "ORD-9" }));
        for action in [
            "GET_PAYMENT_DETAIL",
            "UPDATE_PAYMENT",
            "REQUEST_PAYMENT",
            "CHECK_PAYMENT_COMPLETE",
        ] {
            let reply = mock_reply(action, &request, fixed_now());
            assert_eq!(reply["ok"], json!(true), "{action}");
            assert_eq!(reply["orderNumber"], json!("ORD-9"), "{action}");
            assert_eq!(reply["data"]["orderNumber"], json!("ORD-9"), "{action}");
        }

        let paid = mock_reply("REQUEST_PAYMENT", &request, fixed_now());
        assert_eq!(paid["data"]["paymentKey"], json!("mock_payment_1700000000123"));
        assert_eq!(paid["data"]["paidAt"], json!("2023-11-14T22:13:20.123Z"));
    }

    #[test]
    fn unknown_action_gets_a_message() {
        let reply = mock_reply("OPEN_SETTINGS", &Payload::new(), fixed_now());
        assert_eq!(reply["data"], json!({ "message": "Mock response for OPEN_SETTINGS" }));
        assert!(reply.get("orderNumber").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_after_simulated_latency() {
        let channel = simulated_channel();
        let start = Instant::now();
        let data = channel
            .send("CHECK_PAYMENT_COMPLETE", payload(json!({ "orderNumber": "A7" })), None)
            .await
            .expect("simulated reply");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1_000), "{elapsed:?}");
        assert_eq!(data["status"], json!("completed"));
        assert_eq!(data["amount"], json!(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn payment_detail_round_trip_keeps_order_number() {
        let channel = simulated_channel();
        for _ in 0..3 {
            let data = channel
                .send("GET_PAYMENT_DETAIL", payload(json!({ "orderNumber": "123" })), None)
                .await
                .expect("simulated reply");
            assert_eq!(data["orderNumber"], json!("123"));
        }
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_simulated_requests_each_get_their_own_reply() {
        let channel = simulated_channel();
        let (a, b) = tokio::join!(
            channel.send("GET_PAYMENT_DETAIL", payload(json!({ "orderNumber": "A" })), None),
            channel.send("GET_PAYMENT_DETAIL", payload(json!({ "orderNumber": "B" })), None),
        );
        assert_eq!(a.expect("a")["orderNumber"], json!("A"));
        assert_eq!(b.expect("b")["orderNumber"], json!("B"));
    }

    #[test]
    fn dispatch_outside_a_runtime_is_unavailable() {
        let channel = simulated_channel();
        assert!(matches!(
            channel.call("REQUEST_DRAFT", Payload::new(), None),
            Err(SkysunnyError::HostUnavailable(_))
        ));
        assert_eq!(channel.pending_count(), 0);
    }
}
