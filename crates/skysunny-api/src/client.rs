// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async HTTP client for the SkySunny backend.
//
// Paths are joined onto the configured base URL. Non-2xx statuses and
// transport failures become `SkysunnyError::Http`; a 2xx body is parsed as an
// `ApiEnvelope` and left to the caller to unwrap.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use skysunny_core::config::AppConfig;
use skysunny_core::error::{Result, SkysunnyError};

use crate::envelope::ApiEnvelope;

/// QR code lookup; the aggregate id is the last path segment.
const QR_CODE_PATH: &str = "/user/qr-code";

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend base URL, e.g. `https://skysunny-api.mayoube.co.kr`.
    pub base_url: String,
    /// Per-request timeout. `None` leaves it to the OS.
    pub timeout_seconds: Option<u64>,
    /// Sent with every request.
    pub headers: Vec<(String, String)>,
}

impl ApiClientConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            ..Self::default()
        }
    }
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: AppConfig::default().api_base_url,
            timeout_seconds: Some(30),
            headers: Vec::new(),
        }
    }
}

/// Backend client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    client: reqwest::Client,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let client = builder
            .build()
            .map_err(|e| SkysunnyError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            access_token: None,
        })
    }

    /// Authenticate subsequent requests with `token`.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn prepare_request(
        &self,
        builder: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        let mut builder = builder.header("Accept", "application/json");
        if let Some(token) = &self.access_token {
            builder = builder.header("Authorization", bearer(token));
        }
        for (name, value) in &self.config.headers {
            builder = builder.header(name, value);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder
    }

    #[instrument(skip(self, headers), fields(base = %self.config.base_url))]
    pub async fn get(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<ApiEnvelope> {
        let url = self.build_url(path);
        let request = self.prepare_request(self.client.get(&url).query(query), headers);
        let response = request.send().await.map_err(|e| http_error("GET", e))?;
        read_envelope(response).await
    }

    #[instrument(skip(self, headers, body), fields(base = %self.config.base_url))]
    pub async fn post(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<ApiEnvelope> {
        let url = self.build_url(path);
        let request = self.prepare_request(self.client.post(&url).json(body), headers);
        let response = request.send().await.map_err(|e| http_error("POST", e))?;
        read_envelope(response).await
    }

    /// Fetch the entry QR code for an aggregate (purchase) id.
    pub async fn qr_code(&self, aggregate_id: &str) -> Result<Value> {
        let id = aggregate_id.trim();
        if id.is_empty() || id == "0" {
            return Err(SkysunnyError::InvalidArgument(format!(
                "no valid QR aggregate id: {aggregate_id:?}"
            )));
        }
        self.get(&format!("{QR_CODE_PATH}/{id}"), &[], &[])
            .await?
            .into_result()
    }
}

/// `Bearer <token>`, unless the token already carries the scheme.
pub fn bearer(token: &str) -> String {
    if token.starts_with("Bearer") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

async fn read_envelope(response: reqwest::Response) -> Result<ApiEnvelope> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| http_error("read body", e))?;
    debug!(%status, body_len = body.len(), "backend response");

    if !status.is_success() {
        warn!(%status, "backend returned an error status");
        return Err(SkysunnyError::Http(format!("HTTP {status}")));
    }
    let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
    serde_json::from_str(body).map_err(|e| {
        SkysunnyError::MalformedReply(format!("backend response is not an envelope: {e}"))
    })
}

fn http_error(context: &str, e: reqwest::Error) -> SkysunnyError {
    if e.is_connect() {
        SkysunnyError::Http(format!("{context}: connection failed: {e}"))
    } else if e.is_timeout() {
        SkysunnyError::Http(format!("{context}: timed out: {e}"))
    } else {
        SkysunnyError::Http(format!("{context}: {e}"))
    }
}
