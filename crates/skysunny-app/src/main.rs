// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SkySunny bridge harness
//
// Entry point. Initialises logging and configuration, wires the services, and
// walks one payment through whichever host transport the environment
// selects. Outside the native app that is the simulated host.

mod services;

use std::process::ExitCode;

use serde_json::json;
use tracing::{error, info, warn};

use skysunny_bridge::{CheckoutAmounts, PageContext, PaymentCheck, RuntimeInfo};
use skysunny_core::AppConfig;
use skysunny_core::error::Result;
use skysunny_core::human_errors::{Presentation, humanize_error};
use skysunny_core::types::Payload;

use services::app_services::AppServices;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("SkySunny bridge harness starting");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration, using defaults");
            AppConfig::default()
        }
    };

    let svc = match AppServices::standalone(config) {
        Ok(svc) => svc,
        Err(e) => {
            error!(error = %e, "service initialisation failed");
            return ExitCode::FAILURE;
        }
    };

    match run_checkout(&svc).await {
        Ok(()) => {
            info!("payment flow completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let notice = humanize_error(&e);
            match notice.presentation {
                Presentation::Silent => {
                    info!(error = %e, "payment cancelled");
                    ExitCode::SUCCESS
                }
                _ => {
                    error!(
                        error = %e,
                        message = %notice.message,
                        suggestion = %notice.suggestion,
                        "payment flow failed"
                    );
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Draft, preflight, purchase, and confirmation for a single product.
async fn run_checkout(svc: &AppServices) -> Result<()> {
    info!(transport = %svc.transport_kind(), "running checkout");

    let draft: Payload = json!({
        "productName": "1일권",
        "finalAmount": 12000,
        "paymentMethod": "card",
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    let order_number = svc.create_draft(draft).await?;

    let detail = svc.payments().get_payment_detail(&order_number).await?;
    let amounts = CheckoutAmounts {
        page_final: Some(detail["amount"].clone()),
        ..CheckoutAmounts::default()
    };
    let page = PageContext::default();

    match svc.preflight(Some(&order_number), &amounts, &page) {
        PaymentCheck::Approved { amount, order_id, .. } => {
            info!(order_id = %order_id, amount, "preflight approved");
            let complete = svc.pay(&order_id, Payload::new()).await?;
            info!(%complete, "payment confirmed");
        }
        PaymentCheck::Rejected { reason } => {
            warn!(reason = %reason, "preflight rejected the payment");
        }
    }

    let report = svc.debug_report(
        RuntimeInfo {
            user_agent: format!("skysunny-harness/{}", env!("CARGO_PKG_VERSION")),
            is_online: page.online,
            language: "ko-KR".into(),
            ..RuntimeInfo::default()
        },
        &page,
    );
    info!(report = %serde_json::to_string(&report)?, "payment debug report");
    Ok(())
}
