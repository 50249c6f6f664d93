// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SkySunny core: types, errors, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod storage;
pub mod types;

pub use config::{AppConfig, BridgeConfig, Environment};
pub use error::SkysunnyError;
pub use types::*;
