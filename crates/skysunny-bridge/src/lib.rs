// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! SkySunny: host bridge between the embedded payment web client and the
//! native app.
//!
//! The channel sends named actions to the host through a [`HostTransport`]
//! and correlates the replies that come back on the event, message, and
//! callback paths. The transport is picked once from the runtime's
//! [`HostEnvironment`]: the real call gate when present, a simulated host in
//! a plain browser, or a detached transport that refuses requests when the
//! page is embedded but the gate is missing.

pub mod channel;
pub mod context;
pub mod diagnostics;
pub mod host;
pub mod payment;
pub mod preflight;
pub mod reply;
pub mod simulated;
pub mod traits;

use std::sync::Arc;

use skysunny_core::config::BridgeConfig;
use tracing::warn;

pub use channel::{BridgeChannel, PendingCall, ReplySink};
pub use context::{HostContext, HostOrder, PageContext, QueryParams};
pub use diagnostics::{DebugReport, RuntimeInfo, debug_payment_info};
pub use host::{DetachedTransport, HostEnvironment, HostGateTransport};
pub use payment::PaymentBridge;
pub use preflight::{CheckoutAmounts, PaymentCheck, final_payment_check};
pub use reply::MessageData;
pub use simulated::SimulatedTransport;
pub use traits::{HostGate, HostTransport, PostMessage};

/// Pick the transport for this runtime.
///
/// Fabricated replies are only ever used when there is neither a call gate
/// nor an embedding marker, and the config allows simulation.
pub fn select_transport(env: &HostEnvironment, config: &BridgeConfig) -> Arc<dyn HostTransport> {
    if let Some(gate) = &env.gate {
        return Arc::new(HostGateTransport::new(Arc::clone(gate)));
    }
    if env.embedded {
        warn!("embedding marker present but host call gate missing");
        return Arc::new(DetachedTransport::new(env.post_message.clone()));
    }
    if !config.allow_simulation {
        warn!("no host detected and simulation is disabled");
        return Arc::new(DetachedTransport::new(None));
    }
    Arc::new(SimulatedTransport::new(config.simulated_latency()))
}

/// Build a channel over the transport selected for `env`.
pub fn connect(env: &HostEnvironment, config: BridgeConfig) -> BridgeChannel {
    let transport = select_transport(env, &config);
    BridgeChannel::new(config, transport)
}
