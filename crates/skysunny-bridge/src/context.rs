// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// What the page knows about itself: the host-injected context object, the
// URL query, and connectivity.

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Order summary the host injects alongside the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostOrder {
    /// The host may send the id as a number; it is kept as text.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Number or numeric string, as the host sent it.
    pub amount: Option<Value>,
}

/// Context object injected by the host before the page loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    pub order: Option<HostOrder>,
    pub toss_client_key: Option<String>,
    pub access_token: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

/// Decoded URL query parameters. The first occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    /// Parse `a=1&b=2`, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Everything the pre-payment check and the diagnostic report read from the
/// page.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// `None` when the host injected nothing.
    pub host: Option<HostContext>,
    pub query: QueryParams,
    pub online: bool,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            host: None,
            query: QueryParams::default(),
            online: true,
        }
    }
}
