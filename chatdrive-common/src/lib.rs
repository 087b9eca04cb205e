//! chatdrive-common - Shared configuration and logging for chatdrive.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Logging setup
//! - Small string/duration helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    BrowserConfig, CompletionConfig, CompletionMode, Config, DelayRange, LocatorConfig,
    ObservabilityConfig, RemoteConfig, TimeoutConfig, TypingConfig, TypingMode, Viewport,
};
pub use validation::{Validate, ValidationError, ValidationResult};

