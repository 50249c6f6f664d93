// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: ties the bridge, the backend client, and the page's storage
// together the way the checkout pages use them.

pub mod app_services;
