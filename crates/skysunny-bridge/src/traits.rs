// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport abstraction between the bridge channel and the native host.

use std::sync::Arc;

use skysunny_core::error::Result;
use skysunny_core::types::{HostRequest, Payload, TransportKind};

use crate::channel::ReplySink;

/// The host call gate: dispatches a named action with a payload to the
/// native side. Fire-and-forget; replies arrive later on a reply transport.
pub type HostGate = Arc<dyn Fn(&str, &Payload) + Send + Sync>;

/// Raw string post into the embedding container (the marker object's
/// `postMessage`).
pub type PostMessage = Arc<dyn Fn(&str) + Send + Sync>;

/// How requests leave the web client.
///
/// Selected once at startup (see [`crate::select_transport`]). Implementations
/// never wait for a reply: anything the host answers is handed back through
/// the [`ReplySink`].
pub trait HostTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Send a correlated request. An error here settles the request
    /// immediately.
    fn dispatch(&self, request: &HostRequest, replies: &ReplySink) -> Result<()>;

    /// Send a message that expects no reply (navigation, tab switches).
    fn notify(&self, action: &str, payload: &Payload) -> Result<()>;
}
