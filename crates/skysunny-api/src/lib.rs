// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SkySunny API: thin HTTP client for the backend the payment pages talk to
// directly (coupons, parent verification, QR codes). Responses use the
// `{ code, result, message }` envelope.

pub mod client;
pub mod envelope;

pub use client::{ApiClient, ApiClientConfig};
pub use envelope::{ApiEnvelope, SUCCESS_CODE};
