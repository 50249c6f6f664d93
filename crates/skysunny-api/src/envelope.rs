// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use skysunny_core::error::{Result, SkysunnyError};

/// Envelope code the backend uses for success.
pub const SUCCESS_CODE: i64 = 100;

/// `{ code, result?, message? }` as returned by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// The `result` on success, otherwise an [`SkysunnyError::Api`] carrying
    /// the backend's message.
    pub fn into_result(self) -> Result<Value> {
        if self.is_success() {
            return Ok(self.result);
        }
        let message = self
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("request failed with code {}", self.code));
        Err(SkysunnyError::Api {
            code: self.code,
            message,
        })
    }
}
