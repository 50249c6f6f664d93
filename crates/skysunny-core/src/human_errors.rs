// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the payment screens.
//
// Every technical error is mapped to plain language plus a suggestion. The
// presentation class tells the page whether to block with a dialog, stay
// quiet, or only log.

use crate::error::SkysunnyError;

/// Cancellation code the payment widget and host use when the user backs out.
pub const USER_CANCEL_CODE: &str = "USER_CANCEL";

/// How a page should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Blocking alert dialog; the flow cannot continue.
    Alert,
    /// User-initiated cancellation. Show nothing.
    Silent,
    /// Recoverable noise. Console diagnostics only.
    Diagnostic,
}

/// A human-readable error with a plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (dialog heading).
    pub message: String,
    /// What the user should try (dialog body).
    pub suggestion: String,
    /// Whether trying the same thing again might work.
    pub retriable: bool,
    pub presentation: Presentation,
}

/// Convert a `SkysunnyError` into a `HumanError` a customer can act on.
pub fn humanize_error(err: &SkysunnyError) -> HumanError {
    match err {
        // -- Host bridge --
        SkysunnyError::HostUnavailable(_) => HumanError {
            message: "The app connection isn't available.".into(),
            suggestion: "Close this screen and open the payment again from the app.".into(),
            retriable: false,
            presentation: Presentation::Alert,
        },

        SkysunnyError::RemoteRejected(reason) if is_user_cancel(reason) => HumanError {
            message: "Payment cancelled.".into(),
            suggestion: String::new(),
            retriable: true,
            presentation: Presentation::Silent,
        },

        SkysunnyError::RemoteRejected(reason) => HumanError {
            message: "The request couldn't be completed.".into(),
            suggestion: reason.clone(),
            retriable: true,
            presentation: Presentation::Alert,
        },

        SkysunnyError::Timeout { .. } => HumanError {
            message: "The app didn't respond in time.".into(),
            suggestion: "Check your connection and try again.".into(),
            retriable: true,
            presentation: Presentation::Alert,
        },

        SkysunnyError::MalformedReply(_) => HumanError {
            message: "Ignored an unreadable message from the app.".into(),
            suggestion: String::new(),
            retriable: false,
            presentation: Presentation::Diagnostic,
        },

        SkysunnyError::InvalidArgument(detail) => HumanError {
            message: "Some payment details are missing or invalid.".into(),
            suggestion: format!("Refresh the page and try again. ({detail})"),
            retriable: false,
            presentation: Presentation::Alert,
        },

        // -- Backend API --
        SkysunnyError::Http(_) => HumanError {
            message: "We couldn't reach the server.".into(),
            suggestion: "Check your network connection, then try again.".into(),
            retriable: true,
            presentation: Presentation::Alert,
        },

        SkysunnyError::Api { message, .. } => HumanError {
            message: "The server rejected the request.".into(),
            suggestion: message.clone(),
            retriable: false,
            presentation: Presentation::Alert,
        },

        SkysunnyError::Config(_) => HumanError {
            message: "Payment isn't configured correctly.".into(),
            suggestion: "Please contact customer support.".into(),
            retriable: false,
            presentation: Presentation::Alert,
        },

        SkysunnyError::Io(_) | SkysunnyError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            presentation: Presentation::Diagnostic,
        },
    }
}

fn is_user_cancel(reason: &str) -> bool {
    reason.to_ascii_uppercase().contains(USER_CANCEL_CODE)
}
