// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payment flow actions on top of the bridge channel.
//
// Draft creation happens before the checkout page opens; detail lookup,
// intermediate update, purchase request, and completion check follow once the
// payment widget has done its part.

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, instrument};

use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::types::Payload;

use crate::channel::BridgeChannel;

pub const REQUEST_DRAFT: &str = "REQUEST_DRAFT";
pub const GET_PAYMENT_DETAIL: &str = "GET_PAYMENT_DETAIL";
pub const UPDATE_PAYMENT: &str = "UPDATE_PAYMENT";
pub const REQUEST_PAYMENT: &str = "REQUEST_PAYMENT";
pub const CHECK_PAYMENT_COMPLETE: &str = "CHECK_PAYMENT_COMPLETE";
pub const REQUEST_PAYMENT_COMPLETE: &str = "REQUEST_PAYMENT_COMPLETE";

/// Completion lookups are made while the user watches a spinner.
const PAYMENT_COMPLETE_TIMEOUT: Duration = Duration::from_secs(15);

/// Typed payment operations over a [`BridgeChannel`].
#[derive(Clone)]
pub struct PaymentBridge {
    channel: BridgeChannel,
}

impl PaymentBridge {
    pub fn new(channel: BridgeChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &BridgeChannel {
        &self.channel
    }

    /// Create a temporary order before checkout.
    pub async fn request_draft(&self, draft: Payload) -> Result<Value> {
        self.logged(REQUEST_DRAFT, draft, None).await
    }

    /// Look up a temporary order.
    pub async fn get_payment_detail(&self, order_number: &str) -> Result<Value> {
        let payload = order_payload(order_number, Payload::new())?;
        self.logged(GET_PAYMENT_DETAIL, payload, None).await
    }

    /// Push intermediate payment details (coupon, method, final amount).
    pub async fn update_payment(&self, order_number: &str, update: Payload) -> Result<Value> {
        let payload = order_payload(order_number, update)?;
        self.logged(UPDATE_PAYMENT, payload, None).await
    }

    /// Ask the host to complete the purchase after the widget approved it.
    pub async fn request_payment(&self, order_number: &str, payment: Payload) -> Result<Value> {
        let payload = order_payload(order_number, payment)?;
        self.logged(REQUEST_PAYMENT, payload, None).await
    }

    pub async fn check_payment_complete(&self, order_number: &str) -> Result<Value> {
        let payload = order_payload(order_number, Payload::new())?;
        self.logged(CHECK_PAYMENT_COMPLETE, payload, None).await
    }

    /// Fetch the completed order for the confirmation screen.
    pub async fn request_payment_complete(&self, order_number: &str) -> Result<Value> {
        let payload = order_payload(order_number, Payload::new())?;
        self.logged(REQUEST_PAYMENT_COMPLETE, payload, Some(PAYMENT_COMPLETE_TIMEOUT))
            .await
    }

    /// Navigation and other messages the host answers with nothing.
    pub fn notify(&self, action: &str, payload: &Payload) -> Result<()> {
        self.channel.notify(action, payload)
    }

    #[instrument(skip(self, payload))]
    async fn logged(
        &self,
        action: &'static str,
        payload: Payload,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        match self.channel.send(action, payload, timeout).await {
            Ok(data) => {
                info!(%data, "payment action succeeded");
                Ok(data)
            }
            Err(e) => {
                error!(error = %e, "payment action failed");
                Err(e)
            }
        }
    }
}

/// `{ orderNumber, ..extra }`. Fields in `extra` are laid over the order
/// number, so an `orderNumber` there replaces the argument.
fn order_payload(order_number: &str, extra: Payload) -> Result<Payload> {
    if order_number.trim().is_empty() {
        return Err(SkysunnyError::InvalidArgument("order number is required".into()));
    }
    let mut payload = Payload::new();
    payload.insert("orderNumber".into(), Value::String(order_number.to_string()));
    for (key, value) in extra {
        payload.insert(key, value);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use skysunny_core::config::BridgeConfig;
    use skysunny_core::types::{Delivery, TransportKind};

    use crate::host::HostEnvironment;
    use crate::traits::HostGate;

    type Calls = Arc<Mutex<Vec<(String, Payload)>>>;

    fn gated_bridge() -> (PaymentBridge, Calls) {
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let gate: HostGate = Arc::new(move |action: &str, payload: &Payload| {
            sink.lock()
                .expect("lock")
                .push((action.to_string(), payload.clone()));
        });
        let channel = crate::connect(&HostEnvironment::hosted(gate), BridgeConfig::default());
        (PaymentBridge::new(channel), calls)
    }

    fn simulated_bridge() -> PaymentBridge {
        let channel = crate::connect(&HostEnvironment::standalone(), BridgeConfig::default());
        assert_eq!(channel.transport_kind(), TransportKind::Simulated);
        PaymentBridge::new(channel)
    }

    #[test]
    fn order_number_is_required() {
        assert!(matches!(
            order_payload("  ", Payload::new()),
            Err(SkysunnyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn extra_fields_are_laid_over_the_order_number() {
        let extra = json!({ "orderNumber": "from-update", "couponId": 3 })
            .as_object()
            .cloned()
            .expect("object");
        let payload = order_payload("ORD-1", extra).expect("payload");
        assert_eq!(payload["orderNumber"], json!("from-update"));
        assert_eq!(payload["couponId"], json!(3));

        let payload = order_payload("ORD-1", Payload::new()).expect("payload");
        assert_eq!(payload["orderNumber"], json!("ORD-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_order_number_never_reaches_the_host() {
        let (bridge, calls) = gated_bridge();
        let err = bridge.get_payment_detail("").await.expect_err("invalid");
        assert!(matches!(err, SkysunnyError::InvalidArgument(_)));
        assert!(calls.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn update_merges_order_number_into_payload() {
        let (bridge, calls) = gated_bridge();
        let replies = bridge.channel().replies();
        let update = json!({ "paymentMethod": "card", "finalAmount": 9000 })
            .as_object()
            .cloned()
            .expect("object");

        let task = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.update_payment("ORD-2", update).await }
        });
        tokio::task::yield_now().await;

        {
            let calls = calls.lock().expect("lock");
            assert_eq!(calls[0].0, UPDATE_PAYMENT);
            assert_eq!(calls[0].1["orderNumber"], json!("ORD-2"));
            assert_eq!(calls[0].1["paymentMethod"], json!("card"));
        }

        let delivery = replies
            .deliver_callback(&json!({ "action": "UPDATE_PAYMENT_REPLY", "ok": true, "data": { "updated": true } }))
            .expect("deliver");
        assert!(matches!(delivery, Delivery::Settled(_)));
        let data = task.await.expect("join").expect("updated");
        assert_eq!(data, json!({ "updated": true }));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_request_uses_short_timeout() {
        let (bridge, _calls) = gated_bridge();
        let err = bridge
            .request_payment_complete("ORD-3")
            .await
            .expect_err("host never answers");
        assert!(matches!(err, SkysunnyError::Timeout { after_ms: 15_000, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_flow_runs_end_to_end() {
        let bridge = simulated_bridge();
        let draft = bridge
            .request_draft(
                json!({ "finalAmount": 12000, "productName": "1일권" })
                    .as_object()
                    .cloned()
                    .expect("object"),
            )
            .await
            .expect("draft");
        let order_number = draft["orderNumber"].as_str().expect("order number").to_string();
        assert!(order_number.starts_with("mock_order_"));
        assert_eq!(draft["amount"], json!(12000));

        let detail = bridge.get_payment_detail(&order_number).await.expect("detail");
        assert_eq!(detail["orderNumber"], json!(order_number));

        let paid = bridge
            .request_payment(&order_number, Payload::new())
            .await
            .expect("paid");
        assert_eq!(paid["status"], json!("completed"));

        let done = bridge.check_payment_complete(&order_number).await.expect("done");
        assert_eq!(done["status"], json!("completed"));
    }
}
