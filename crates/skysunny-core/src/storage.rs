// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pass-through key-value storage.
//
// The payment client owns no persistence of its own. It reads and writes the
// browser's local (durable) and session (tab-scoped) stores, which are
// injected here behind `KeyValueStore`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Durable keys (browser local storage).
pub mod local_keys {
    pub const USER_ID: &str = "userId";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const LAST_ORDER_NUMBER: &str = "lastOrderNumber";
}

/// Tab-scoped keys (browser session storage).
pub mod session_keys {
    pub const TOSS_DRAFT: &str = "toss:draft";
    pub const DB_ORDER_ID: &str = "dbOrderId";
    pub const TOSS_ORDER_ID_MAPPING: &str = "tossOrderIdMapping";
    pub const QR_PAYLOAD: &str = "qr:payload";
}

/// Prefix of the duplicate-payment guard keys (`payment_<orderId>`).
pub const PAYMENT_KEY_PREFIX: &str = "payment_";

/// Duplicate-payment guard key for an order.
pub fn payment_guard_key(order_id: &str) -> String {
    format!("{PAYMENT_KEY_PREFIX}{order_id}")
}

/// String key-value store with browser storage semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    /// All keys currently present, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        keys
    }
}

/// In-memory store, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok().and_then(|e| e.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }
}
