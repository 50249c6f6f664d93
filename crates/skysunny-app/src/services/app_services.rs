// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: selects the host transport once, and exposes the
// checkout steps (draft, preflight, payment, confirmation, QR lookup) with
// the storage side effects the pages rely on.
//
// Storage is injected as `Arc<dyn KeyValueStore>` so the harness can run on
// in-memory stores while a real page supplies its browser storage.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use skysunny_api::{ApiClient, ApiClientConfig};
use skysunny_bridge::{
    CheckoutAmounts, DebugReport, HostEnvironment, PageContext, PaymentBridge, PaymentCheck,
    RuntimeInfo, debug_payment_info, final_payment_check,
};
use skysunny_core::AppConfig;
use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::storage::{KeyValueStore, MemoryStore, local_keys, session_keys};
use skysunny_core::types::{Payload, TransportKind};

/// Shared services. Every field is cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    config: AppConfig,
    env: HostEnvironment,
    payments: PaymentBridge,
    api: ApiClient,
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

#[allow(dead_code)]
impl AppServices {
    /// Wire the services for `env`. Call once at startup.
    pub fn init(
        config: AppConfig,
        env: HostEnvironment,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        info!(environment = %config.environment, "initialising app services");
        let channel = skysunny_bridge::connect(&env, config.bridge.clone());
        let api = ApiClient::new(ApiClientConfig::from_app(&config))?;
        info!(transport = %channel.transport_kind(), "app services initialised");

        Ok(Self {
            config,
            env,
            payments: PaymentBridge::new(channel),
            api,
            local,
            session,
        })
    }

    /// No host, fresh in-memory storage.
    pub fn standalone(config: AppConfig) -> Result<Self> {
        Self::init(
            config,
            HostEnvironment::standalone(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn payments(&self) -> &PaymentBridge {
        &self.payments
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.payments.channel().transport_kind()
    }

    // -- Checkout ------------------------------------------------------------

    /// Create the temporary order and remember it for the checkout page.
    ///
    /// Returns the order number the host assigned.
    pub async fn create_draft(&self, draft: Payload) -> Result<String> {
        let data = self.payments.request_draft(draft).await?;
        let order_number = match &data["orderNumber"] {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(SkysunnyError::MalformedReply(
                    "draft reply carries no order number".into(),
                ));
            }
        };

        self.session
            .set(session_keys::TOSS_DRAFT, &serde_json::to_string(&data)?);
        self.local.set(local_keys::LAST_ORDER_NUMBER, &order_number);
        info!(order_number = %order_number, "draft stored");
        Ok(order_number)
    }

    /// Last check before the payment widget runs.
    pub fn preflight(
        &self,
        order_number: Option<&str>,
        amounts: &CheckoutAmounts,
        page: &PageContext,
    ) -> PaymentCheck {
        final_payment_check(
            order_number,
            amounts,
            page,
            self.local.as_ref(),
            self.session.as_ref(),
            Utc::now(),
        )
    }

    /// Ask the host to complete the purchase, then confirm it.
    pub async fn pay(&self, order_number: &str, payment: Payload) -> Result<Value> {
        let paid = self.payments.request_payment(order_number, payment).await?;
        info!(order_number, status = %paid["status"], "purchase requested");

        let complete = self.payments.check_payment_complete(order_number).await?;
        if complete["status"] != "completed" {
            warn!(order_number, status = %complete["status"], "payment not completed yet");
        }
        Ok(complete)
    }

    pub fn debug_report(&self, runtime: RuntimeInfo, page: &PageContext) -> DebugReport {
        debug_payment_info(
            runtime,
            page,
            &self.env,
            self.transport_kind(),
            self.local.as_ref(),
            self.session.as_ref(),
            Utc::now(),
        )
    }

    // -- Backend -------------------------------------------------------------

    /// Fetch the entry QR code and keep it for the QR page.
    pub async fn fetch_qr(&self, aggregate_id: &str) -> Result<Value> {
        let mut api = self.api.clone();
        if let Some(token) = self.local.get(local_keys::ACCESS_TOKEN) {
            api = api.with_access_token(token);
        }
        let qr = api.qr_code(aggregate_id).await?;
        self.session
            .set(session_keys::QR_PAYLOAD, &serde_json::to_string(&qr)?);
        Ok(qr)
    }
}
