//! Configuration validation.
//!
//! Catches values that would otherwise surface as panics or silent
//! misbehavior deep inside a browser session (inverted delay ranges,
//! a zero poll interval, malformed URLs).

use thiserror::Error;

use crate::config::{
    CompletionConfig, Config, DelayRange, LocatorConfig, ObservabilityConfig, RemoteConfig,
    TimeoutConfig, TypingConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "pretty"];

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let sections: [&dyn Validate; 6] = [
            &self.remote,
            &self.typing,
            &self.completion,
            &self.timeouts,
            &self.locators,
            &self.observability,
        ];

        let mut errors: Vec<ValidationError> = sections
            .iter()
            .filter_map(|section| section.validate().err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

fn check_range(field: &str, range: &DelayRange) -> ValidationResult<()> {
    if !range.min_secs.is_finite() || !range.max_secs.is_finite() {
        return Err(invalid(field, "bounds must be finite"));
    }
    if range.min_secs < 0.0 {
        return Err(invalid(field, "min_secs must not be negative"));
    }
    if range.max_secs < range.min_secs {
        return Err(invalid(
            field,
            format!("max_secs {} is below min_secs {}", range.max_secs, range.min_secs),
        ));
    }
    Ok(())
}

fn check_not_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl Validate for RemoteConfig {
    fn validate(&self) -> ValidationResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| invalid("remote.base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("remote.base_url", "scheme must be http or https"));
        }
        if !self.conversation_path.starts_with('/') || !self.conversation_path.ends_with('/') {
            return Err(invalid(
                "remote.conversation_path",
                "must start and end with '/'",
            ));
        }
        Ok(())
    }
}

impl Validate for TypingConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_range("typing.char_delay", &self.char_delay)?;
        check_range("typing.chord_delay", &self.chord_delay)?;
        check_range("typing.submit_pause", &self.submit_pause)?;
        check_range("typing.hover_hold", &self.hover_hold)?;
        check_range("typing.menu_pause", &self.menu_pause)
    }
}

impl Validate for CompletionConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_not_empty("completion.method", &self.method)?;
        if !self.path.starts_with('/') {
            return Err(invalid("completion.path", "must start with '/'"));
        }
        check_not_empty("completion.status_field", &self.status_field)?;
        check_not_empty("completion.done_label", &self.done_label)?;
        check_range("completion.settle", &self.settle)
    }
}

impl Validate for TimeoutConfig {
    fn validate(&self) -> ValidationResult<()> {
        for (field, value) in [
            ("timeouts.element_secs", self.element_secs),
            ("timeouts.ready_secs", self.ready_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, "must be a non-negative number of seconds"));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("timeouts.poll_interval_ms", "must be positive"));
        }
        Ok(())
    }
}

impl Validate for LocatorConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_not_empty("locators.input", &self.input)?;
        check_not_empty("locators.action_button", &self.action_button)?;
        check_not_empty("locators.message_entry", &self.message_entry)?;
        check_not_empty("locators.role_attribute", &self.role_attribute)?;
        check_not_empty("locators.id_attribute", &self.id_attribute)?;
        check_not_empty("locators.profile_button", &self.profile_button)?;
        check_not_empty("locators.settings_menu", &self.settings_menu)?;
        check_not_empty("locators.menu_entry", &self.menu_entry)?;
        if let Some(submit) = &self.submit {
            check_not_empty("locators.submit", submit)?;
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "observability.log_level",
                format!("expected one of {LOG_LEVELS:?}"),
            ));
        }
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(invalid(
                "observability.log_format",
                format!("expected one of {LOG_FORMATS:?}"),
            ));
        }
        Ok(())
    }
}
