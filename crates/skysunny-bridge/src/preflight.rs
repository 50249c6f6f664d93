// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Last check before the payment widget is asked to charge.
//
// The amount and order number can each come from several places; the first
// usable source in priority order wins. A short-lived guard in session
// storage blocks double taps on the pay button.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use skysunny_core::storage::{KeyValueStore, local_keys, payment_guard_key, session_keys};

use crate::context::PageContext;

/// Largest amount the web client will submit (10,000,000 won).
pub const MAX_PAYMENT_AMOUNT: f64 = 10_000_000.0;
/// Window in which a second attempt for the same order is refused.
pub const DUPLICATE_WINDOW_MS: i64 = 5_000;
pub const MIN_ORDER_ID_LEN: usize = 3;

/// Amounts the page computed itself.
#[derive(Debug, Clone, Default)]
pub struct CheckoutAmounts {
    /// Passed in by the caller; highest priority.
    pub context: Option<Value>,
    /// Final amount after coupons, as computed by the checkout page.
    pub page_final: Option<Value>,
    pub page_payment: Option<Value>,
}

/// Where the chosen amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AmountSource {
    Context,
    PageFinal,
    PagePayment,
    HostOrder,
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PaymentCheck {
    Approved {
        amount: f64,
        source: AmountSource,
        order_id: String,
    },
    Rejected {
        reason: String,
    },
}

impl PaymentCheck {
    fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

/// Validate amount and order, and arm the duplicate guard on success.
pub fn final_payment_check(
    order_number: Option<&str>,
    amounts: &CheckoutAmounts,
    page: &PageContext,
    local: &dyn KeyValueStore,
    session: &dyn KeyValueStore,
    now: DateTime<Utc>,
) -> PaymentCheck {
    let host_order = page.host.as_ref().and_then(|h| h.order.as_ref());

    let candidates = [
        (AmountSource::Context, amounts.context.as_ref().and_then(parse_amount)),
        (AmountSource::PageFinal, amounts.page_final.as_ref().and_then(parse_amount)),
        (AmountSource::PagePayment, amounts.page_payment.as_ref().and_then(parse_amount)),
        (
            AmountSource::HostOrder,
            host_order.and_then(|o| o.amount.as_ref()).and_then(parse_amount),
        ),
        (AmountSource::Url, page.query.get("amount").and_then(parse_amount_str)),
    ];
    debug!(?candidates, "amount candidates");
    let chosen = candidates
        .into_iter()
        .find_map(|(source, amount)| amount.map(|a| (source, a)));

    let Some((source, amount)) = chosen else {
        warn!("no usable payment amount found");
        return PaymentCheck::rejected(
            "The payment amount could not be confirmed. Please refresh the page.",
        );
    };

    if amount > MAX_PAYMENT_AMOUNT {
        return PaymentCheck::rejected(
            "The payment amount is too large. Please contact customer support.",
        );
    }

    let order_id = non_empty(order_number)
        .or_else(|| non_empty(host_order.and_then(|o| o.id.as_deref())))
        .or_else(|| non_empty(page.query.get("orderId")))
        .or_else(|| non_empty(page.query.get("orderNumber")))
        .or_else(|| draft_order_number(session))
        .or_else(|| non_empty(local.get(local_keys::LAST_ORDER_NUMBER).as_deref()));

    if let Some(id) = &order_id {
        if id.chars().count() < MIN_ORDER_ID_LEN {
            warn!(order_id = %id, "order number too short");
            return PaymentCheck::rejected("The order number is not valid.");
        }
    }

    let order_id = order_id.unwrap_or_else(|| {
        let generated = format!("temp_order_{}", now.timestamp_millis());
        info!(order_id = %generated, "no order number found, generated a temporary one");
        generated
    });

    if !page.online {
        return PaymentCheck::rejected("Please check your network connection.");
    }

    let guard_key = payment_guard_key(&order_id);
    let now_ms = now.timestamp_millis();
    let last_attempt = session.get(&guard_key).and_then(|t| t.trim().parse::<i64>().ok());
    if last_attempt.is_some_and(|t| now_ms.saturating_sub(t) < DUPLICATE_WINDOW_MS) {
        warn!(order_id = %order_id, "payment already in progress");
        return PaymentCheck::rejected(
            "A payment is already in progress. Please try again in a moment.",
        );
    }
    session.set(&guard_key, &now_ms.to_string());

    info!(order_id = %order_id, amount, ?source, "final payment check passed");
    PaymentCheck::Approved {
        amount,
        source,
        order_id,
    }
}

/// A positive, finite amount from a number or numeric string.
fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|a| a.is_finite() && *a > 0.0),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

fn parse_amount_str(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// `orderNumber` (or `data.orderNumber`) of the stored draft.
fn draft_order_number(session: &dyn KeyValueStore) -> Option<String> {
    let raw = session.get(session_keys::TOSS_DRAFT)?;
    let draft: Value = match serde_json::from_str(&raw) {
        Ok(draft) => draft,
        Err(e) => {
            warn!(error = %e, "stored draft is not valid JSON");
            return None;
        }
    };
    [&draft["orderNumber"], &draft["data"]["orderNumber"]]
        .into_iter()
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use skysunny_core::storage::MemoryStore;

    use crate::context::{HostContext, HostOrder, QueryParams};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).single().expect("timestamp")
    }

    fn check(
        order_number: Option<&str>,
        amounts: &CheckoutAmounts,
        page: &PageContext,
        local: &MemoryStore,
        session: &MemoryStore,
    ) -> PaymentCheck {
        final_payment_check(order_number, amounts, page, local, session, now())
    }

    fn page_with_query(query: &str) -> PageContext {
        PageContext {
            query: QueryParams::parse(query),
            ..PageContext::default()
        }
    }

    #[test]
    fn context_amount_beats_every_other_source() {
        let amounts = CheckoutAmounts {
            context: Some(json!("9000")),
            page_final: Some(json!(8000)),
            page_payment: None,
        };
        let page = PageContext {
            host: Some(HostContext {
                order: Some(HostOrder {
                    id: Some("ORD-1".into()),
                    amount: Some(json!(7000)),
                }),
                ..HostContext::default()
            }),
            query: QueryParams::parse("amount=6000"),
            online: true,
        };
        let result = check(None, &amounts, &page, &MemoryStore::new(), &MemoryStore::new());
        assert_eq!(
            result,
            PaymentCheck::Approved {
                amount: 9000.0,
                source: AmountSource::Context,
                order_id: "ORD-1".into(),
            }
        );
    }

    #[test]
    fn unusable_amounts_fall_through_to_url() {
        let amounts = CheckoutAmounts {
            context: Some(json!(0)),
            page_final: Some(json!("abc")),
            page_payment: Some(json!(-5)),
        };
        let page = page_with_query("amount=12000&orderId=ORD-22");
        let result = check(None, &amounts, &page, &MemoryStore::new(), &MemoryStore::new());
        assert!(matches!(
            result,
            PaymentCheck::Approved { amount, source: AmountSource::Url, ref order_id }
                if amount == 12000.0 && order_id == "ORD-22"
        ));
    }

    #[test]
    fn missing_amount_is_rejected() {
        let result = check(
            Some("ORD-1"),
            &CheckoutAmounts::default(),
            &PageContext::default(),
            &MemoryStore::new(),
            &MemoryStore::new(),
        );
        assert!(!result.is_approved());
    }

    #[test]
    fn amount_ceiling_is_enforced() {
        let amounts = CheckoutAmounts {
            context: Some(json!(10_000_001)),
            ..CheckoutAmounts::default()
        };
        let result = check(Some("ORD-1"), &amounts, &PageContext::default(), &MemoryStore::new(), &MemoryStore::new());
        assert!(!result.is_approved());

        let amounts = CheckoutAmounts {
            context: Some(json!(10_000_000)),
            ..CheckoutAmounts::default()
        };
        let result = check(Some("ORD-1"), &amounts, &PageContext::default(), &MemoryStore::new(), &MemoryStore::new());
        assert!(result.is_approved());
    }

    #[test]
    fn short_order_number_is_rejected() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let result = check(Some("A1"), &amounts, &PageContext::default(), &MemoryStore::new(), &MemoryStore::new());
        assert!(matches!(result, PaymentCheck::Rejected { .. }));
    }

    #[test]
    fn order_number_falls_back_to_draft_then_last_order() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let local = MemoryStore::new();
        local.set(local_keys::LAST_ORDER_NUMBER, "LAST-1");
        let session = MemoryStore::new();
        session.set(session_keys::TOSS_DRAFT, r#"{ "data": { "orderNumber": "DRAFT-1" } }"#);

        let result = check(None, &amounts, &PageContext::default(), &local, &session);
        assert!(matches!(result, PaymentCheck::Approved { ref order_id, .. } if order_id == "DRAFT-1"));

        let session = MemoryStore::new();
        session.set(session_keys::TOSS_DRAFT, "not json");
        let result = check(None, &amounts, &PageContext::default(), &local, &session);
        assert!(matches!(result, PaymentCheck::Approved { ref order_id, .. } if order_id == "LAST-1"));
    }

    #[test]
    fn temporary_order_number_is_generated() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let result = check(None, &amounts, &PageContext::default(), &MemoryStore::new(), &MemoryStore::new());
        assert!(matches!(
            result,
            PaymentCheck::Approved { ref order_id, .. } if order_id == "temp_order_1700000000000"
        ));
    }

    #[test]
    fn offline_is_rejected() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let page = PageContext {
            online: false,
            ..PageContext::default()
        };
        let result = check(Some("ORD-1"), &amounts, &page, &MemoryStore::new(), &MemoryStore::new());
        assert!(!result.is_approved());
    }

    #[test]
    fn extreme_stored_attempt_times_do_not_overflow() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let local = MemoryStore::new();
        let session = MemoryStore::new();
        let page = PageContext::default();

        session.set("payment_ORD-1", &i64::MIN.to_string());
        let result = final_payment_check(Some("ORD-1"), &amounts, &page, &local, &session, now());
        assert!(result.is_approved());
        assert_eq!(session.get("payment_ORD-1").as_deref(), Some("1700000000000"));

        // A stamp from the future still counts as a recent attempt.
        session.set("payment_ORD-2", &i64::MAX.to_string());
        let result = final_payment_check(Some("ORD-2"), &amounts, &page, &local, &session, now());
        assert!(!result.is_approved());

        session.set("payment_ORD-3", "not a time");
        let result = final_payment_check(Some("ORD-3"), &amounts, &page, &local, &session, now());
        assert!(result.is_approved());
    }

    #[test]
    fn second_attempt_within_window_is_refused() {
        let amounts = CheckoutAmounts {
            context: Some(json!(1000)),
            ..CheckoutAmounts::default()
        };
        let local = MemoryStore::new();
        let session = MemoryStore::new();
        let page = PageContext::default();

        let first = final_payment_check(Some("ORD-1"), &amounts, &page, &local, &session, now());
        assert!(first.is_approved());
        assert_eq!(
            session.get("payment_ORD-1").as_deref(),
            Some("1700000000000")
        );

        let soon = now() + chrono::Duration::milliseconds(4_999);
        let second = final_payment_check(Some("ORD-1"), &amounts, &page, &local, &session, soon);
        assert!(!second.is_approved());

        let later = now() + chrono::Duration::milliseconds(5_000);
        let third = final_payment_check(Some("ORD-1"), &amounts, &page, &local, &session, later);
        assert!(third.is_approved());
    }
}
