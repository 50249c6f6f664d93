// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Snapshot of everything support needs when a payment misbehaves. Secrets
// are never copied into the report, only whether they are set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use skysunny_core::storage::{KeyValueStore, PAYMENT_KEY_PREFIX};
use skysunny_core::types::TransportKind;

use crate::context::{HostOrder, PageContext};
use crate::host::HostEnvironment;

const MASKED: &str = "***set***";
const NOT_SET: &str = "not_set";

/// Browser facts the page reports about itself.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub user_agent: String,
    pub url: String,
    pub origin: String,
    pub is_online: bool,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub timestamp: DateTime<Utc>,
    pub environment: RuntimeInfo,
    pub skysunny: HostContextReport,
    pub url_params: UrlParamsReport,
    pub webview_bridge: BridgeReport,
    pub session_storage: StorageReport,
    pub local_storage: StorageReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContextReport {
    pub available: bool,
    pub user_id: String,
    pub order: Option<HostOrder>,
    pub toss_client_key: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlParamsReport {
    pub order_id: Option<String>,
    pub amount: Option<String>,
    pub user_id: Option<String>,
    pub toss_client_key: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReport {
    pub has_gate: bool,
    pub embedded: bool,
    pub transport: TransportKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageReport {
    pub payment_keys: Vec<String>,
}

impl StorageReport {
    fn scan(store: &dyn KeyValueStore) -> Self {
        Self {
            payment_keys: store.keys_with_prefix(PAYMENT_KEY_PREFIX),
        }
    }
}

/// Collect the payment debugging report.
pub fn debug_payment_info(
    runtime: RuntimeInfo,
    page: &PageContext,
    env: &HostEnvironment,
    transport: TransportKind,
    local: &dyn KeyValueStore,
    session: &dyn KeyValueStore,
    now: DateTime<Utc>,
) -> DebugReport {
    let host = page.host.as_ref();

    let report = DebugReport {
        timestamp: now,
        environment: runtime,
        skysunny: HostContextReport {
            available: host.is_some(),
            user_id: host
                .and_then(|h| h.user_id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| NOT_SET.to_string()),
            order: host.and_then(|h| h.order.clone()),
            toss_client_key: mask(host.and_then(|h| h.toss_client_key.as_deref())),
        },
        url_params: UrlParamsReport {
            order_id: page.query.get("orderId").map(str::to_string),
            amount: page.query.get("amount").map(str::to_string),
            user_id: page.query.get("userId").map(str::to_string),
            toss_client_key: page
                .query
                .get("tossClientKey")
                .filter(|k| !k.is_empty())
                .map(|_| MASKED),
        },
        webview_bridge: BridgeReport {
            has_gate: env.has_gate(),
            embedded: env.embedded,
            transport,
        },
        session_storage: StorageReport::scan(session),
        local_storage: StorageReport::scan(local),
    };
    debug!(?report, "payment debug report");
    report
}

fn mask(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => MASKED,
        _ => NOT_SET,
    }
}
