//! Error types for chatdrive-browser.

use std::time::Duration;

/// Result type alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session engine errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not initialized: call start() before performing actions")]
    SessionNotInitialized,

    #[error("Invalid identifier {value:?}: expected a UUIDv4")]
    InvalidIdentifier { value: String },

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Page not ready after {timeout:?}")]
    NotReady { timeout: Duration },

    #[error("Completion not observed within {timeout:?}")]
    CompletionTimeout { timeout: Duration },

    #[error("Automation handle failure: {0}")]
    AutomationHandleFailure(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),
}

impl SessionError {
    /// Whether a bounded wait ran out of budget.
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::NotReady { .. } | Self::CompletionTimeout { .. }
        )
    }

    pub fn handle(err: impl std::fmt::Display) -> Self {
        Self::AutomationHandleFailure(err.to_string())
    }
}
