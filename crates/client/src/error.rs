//! Error categories and user notifications.
//!
//! Every failure the user can see falls into one of three categories:
//! validation (blocks submission), network/HTTP (request failed) and payment
//! gateway (the charge did not go through). Nothing is retried locally; the
//! failure is surfaced as a [`Notice`] and the flow returns to an editable
//! state.

use std::fmt;

use serde::Serialize;

/// The three kinds of failure a user can be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Network,
    PaymentGateway,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Network => write!(f, "network"),
            Self::PaymentGateway => write!(f, "payment_gateway"),
        }
    }
}

/// Errors that know how to present themselves to a user.
pub trait Categorized {
    /// Which kind of failure this is.
    fn category(&self) -> ErrorCategory;

    /// A message safe to show to the user. Never includes response bodies
    /// or credentials.
    fn user_message(&self) -> String;
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Info,
    Error(ErrorCategory),
}

/// A short, user-facing notification (a toast in a UI, a line on a terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    /// Build the notice for an error.
    #[must_use]
    pub fn from_error<E: Categorized + ?Sized>(err: &E) -> Self {
        Self {
            kind: NoticeKind::Error(err.category()),
            message: err.user_message(),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, NoticeKind::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Log an error and, for network and gateway failures, capture it to Sentry.
///
/// Validation failures are expected user input problems and only logged at
/// debug level.
pub fn report<E>(err: &E) -> Notice
where
    E: Categorized + std::error::Error + 'static,
{
    match err.category() {
        ErrorCategory::Validation => {
            tracing::debug!(error = %err, "Validation failed");
        }
        category => {
            let event_id = sentry::capture_error(err);
            tracing::error!(
                error = %err,
                category = %category,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
    Notice::from_error(err)
}

/// Add a breadcrumb for a checkout step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
