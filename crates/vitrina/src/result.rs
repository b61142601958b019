//! Result and error types for Vitrina.

use std::time::Duration;
use thiserror::Error;

/// Result type for Vitrina operations
pub type VitrinaResult<T> = Result<T, VitrinaError>;

/// Errors that can occur while driving the storefront
#[derive(Debug, Error)]
pub enum VitrinaError {
    /// Browser engine launch error
    #[error("Failed to launch browser engine: {message}")]
    EngineLaunch {
        /// Error message
        message: String,
    },

    /// Session creation error (context/page could not be opened)
    #[error("Failed to open session: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {}ms waiting for {what}", timeout.as_millis())]
    Timeout {
        /// What was being waited for
        what: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The navigated page never became interactable.
    ///
    /// Distinct from a business assertion failure: the final
    /// navigation-affordance check of the readiness probe did not pass, so
    /// the test cannot meaningfully run.
    #[error("Page not ready: {detail}")]
    NotReady {
        /// Which readiness step failed
        detail: String,
    },

    /// The price display neither matched the expectation nor stabilized
    #[error(
        "Price did not stabilize/reach expected value within {}ms. Last observed: '{last_text}'",
        timeout.as_millis()
    )]
    PriceUnsettled {
        /// Raw text of the last sample, for diagnosis
        last_text: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A currency-formatted string could not be parsed to a number
    #[error("Cannot parse price from '{raw}'")]
    Currency {
        /// The offending raw text
        raw: String,
    },

    /// Element interaction error (click/fill/read against the live page)
    #[error("Interaction with '{selector}' failed: {message}")]
    Interaction {
        /// Selector of the target element
        selector: String,
        /// Error message
        message: String,
    },

    /// Screenshot capture error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Trace recording error
    #[error("Trace capture failed: {message}")]
    Trace {
        /// Error message
        message: String,
    },

    /// Credential store error
    #[error("Credential store error: {message}")]
    Credentials {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VitrinaError {
    /// Construct a timeout error for a named wait.
    #[must_use]
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }

    /// True if this error is a timeout (the sole cancellation mechanism;
    /// optional probes swallow these, mandatory waits propagate them).
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_wait_and_duration() {
        let err = VitrinaError::timeout("cart badge", Duration::from_millis(1500));
        let msg = err.to_string();
        assert!(msg.contains("1500ms"));
        assert!(msg.contains("cart badge"));
        assert!(err.is_timeout());
    }

    #[test]
    fn price_unsettled_carries_last_text() {
        let err = VitrinaError::PriceUnsettled {
            last_text: "$1,199.00".to_string(),
            timeout: Duration::from_secs(15),
        };
        assert!(err.to_string().contains("$1,199.00"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn not_ready_is_distinct_from_timeout() {
        let err = VitrinaError::NotReady {
            detail: "primary navigation affordance never became visible".to_string(),
        };
        assert!(err.to_string().starts_with("Page not ready"));
        assert!(!err.is_timeout());
    }
}
