// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Values come from defaults, an optional JSON document, and `SKYSUNNY_*`
// environment variables, in that order of increasing precedence.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SkysunnyError};

pub const ENV_ENVIRONMENT: &str = "SKYSUNNY_ENV";
pub const ENV_API_BASE_URL: &str = "SKYSUNNY_API_BASE_URL";
pub const ENV_BRIDGE_TIMEOUT_MS: &str = "SKYSUNNY_BRIDGE_TIMEOUT_MS";
pub const ENV_ALLOW_SIMULATION: &str = "SKYSUNNY_ALLOW_SIMULATION";

/// Deployment environment of the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Default backend base URL for this environment.
    pub fn api_base_url(self) -> &'static str {
        match self {
            Self::Development => "https://skysunny-api-dev.mayoube.co.kr",
            Self::Staging | Self::Production => "https://skysunny-api.mayoube.co.kr",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" | "stg" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Pick the environment: explicit name first, then the page hostname,
    /// then the build profile. Release builds land on staging unless
    /// production is requested explicitly.
    pub fn detect(explicit: Option<&str>, hostname: Option<&str>) -> Self {
        if let Some(env) = explicit.and_then(Self::parse) {
            return env;
        }
        if let Some(host) = hostname {
            if host.contains("dev") || host.contains("localhost") || host.contains("127.0.0.1") {
                return Self::Development;
            }
            if host.contains("staging") || host.contains("stg") {
                return Self::Staging;
            }
        }
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Staging
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Tuning for the host bridge channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Namespace used for the reply event name and the message source marker.
    pub namespace: String,
    /// Deadline applied when a caller does not pass one.
    pub default_timeout_ms: u64,
    /// Artificial latency of fabricated replies when no host is present.
    pub simulated_latency_ms: u64,
    /// Add a `requestId` field to every outgoing payload.
    pub attach_request_id: bool,
    /// Permit fabricated replies outside the host app. Deployments that must
    /// never see mock data turn this off and get `HostUnavailable` instead.
    pub allow_simulation: bool,
}

impl BridgeConfig {
    /// Name of the structured reply event, e.g. `skysunny:reply`.
    pub fn reply_event_name(&self) -> String {
        format!("{}:reply", self.namespace)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: "skysunny".into(),
            default_timeout_ms: 30_000,
            simulated_latency_ms: 500,
            attach_request_id: true,
            allow_simulation: true,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend deployment environment.
    pub environment: Environment,
    /// Backend base URL; defaults to the environment's URL.
    pub api_base_url: String,
    /// Host bridge tuning.
    pub bridge: BridgeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let environment = Environment::detect(None, None);
        Self {
            environment,
            api_base_url: environment.api_base_url().to_string(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        debug!(environment = %config.environment, "config parsed from JSON");
        Ok(config)
    }

    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `SKYSUNNY_*` overrides from `lookup`. Split out from
    /// [`AppConfig::from_env`] so tests can supply variables without touching
    /// the process environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_ENVIRONMENT) {
            let environment = Environment::parse(&raw).ok_or_else(|| {
                SkysunnyError::Config(format!("{ENV_ENVIRONMENT}: unknown environment {raw:?}"))
            })?;
            if self.api_base_url == self.environment.api_base_url() {
                self.api_base_url = environment.api_base_url().to_string();
            }
            self.environment = environment;
        }

        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(ENV_BRIDGE_TIMEOUT_MS) {
            self.bridge.default_timeout_ms = raw.trim().parse().map_err(|e| {
                SkysunnyError::Config(format!("{ENV_BRIDGE_TIMEOUT_MS}: {e}"))
            })?;
        }

        if let Some(raw) = lookup(ENV_ALLOW_SIMULATION) {
            self.bridge.allow_simulation = parse_flag(&raw).ok_or_else(|| {
                SkysunnyError::Config(format!("{ENV_ALLOW_SIMULATION}: expected a boolean, got {raw:?}"))
            })?;
        }

        info!(
            environment = %self.environment,
            api_base_url = %self.api_base_url,
            "configuration loaded"
        );
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
