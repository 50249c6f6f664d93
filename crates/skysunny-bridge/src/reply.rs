// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reply normalization.
//
// Hosts are inconsistent about reply shape: the outcome may sit at the top
// level or under `detail`, the body under `data`, `payload`, or `detail`, and
// the failure reason under any of those. Everything is folded into `Reply`
// before matching.

use serde_json::Value;
use skysunny_core::error::{Result, SkysunnyError};
use skysunny_core::types::{REQUEST_ID_FIELD, Reply, RequestId, is_truthy};

/// Raw data of a cross-context message: either the JSON text the host posted
/// or a value the runtime already parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageData {
    Text(String),
    Json(Value),
}

impl From<&str> for MessageData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for MessageData {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl MessageData {
    /// Parse into a JSON value.
    pub fn parse(&self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            Self::Text(text) => serde_json::from_str(text)
                .map_err(|e| SkysunnyError::MalformedReply(format!("message is not JSON: {e}"))),
        }
    }
}

/// Normalize a raw reply, unwrapping a non-null `detail` member first.
pub fn normalize(raw: &Value) -> Result<Reply> {
    let body = match raw.get("detail") {
        Some(detail) if !detail.is_null() => detail,
        _ => raw,
    };
    normalize_body(body)
}

/// Normalize a reply body that is already unwrapped (an event's `detail`).
pub fn normalize_body(body: &Value) -> Result<Reply> {
    let fields = body.as_object().ok_or_else(|| {
        SkysunnyError::MalformedReply(format!("expected an object, got {}", kind_of(body)))
    })?;

    let action = ["action", "type"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .map(str::to_string);

    let ok = fields.get("ok").is_some_and(is_truthy);

    let error = present(fields.get("error"))
        .or_else(|| present(fields.get("data").and_then(|d| d.get("error"))))
        .or_else(|| present(fields.get("payload").and_then(|p| p.get("error"))))
        .map(|reason| match reason {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    let data = ["data", "payload", "detail"]
        .iter()
        .find_map(|key| present(fields.get(*key)))
        .unwrap_or(body)
        .clone();

    let request_id = fields
        .get(REQUEST_ID_FIELD)
        .and_then(Value::as_str)
        .and_then(RequestId::parse);

    Ok(Reply {
        action,
        ok,
        error,
        data,
        request_id,
    })
}

/// `Some` for present, non-null values.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
