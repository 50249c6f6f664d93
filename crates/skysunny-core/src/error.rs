// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for SkySunny.

use thiserror::Error;

/// Top-level error type for all SkySunny operations.
#[derive(Debug, Error)]
pub enum SkysunnyError {
    // -- Host bridge --
    /// No dispatch transport and no applicable fallback.
    #[error("host bridge not found: {0}")]
    HostUnavailable(String),

    /// The host replied with `ok = false`. Displays the host's reason verbatim.
    #[error("{0}")]
    RemoteRejected(String),

    #[error("{action} response timed out after {after_ms} ms")]
    Timeout { action: String, after_ms: u64 },

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Backend API --
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SkysunnyError>;
