//! Configuration management for chatdrive.
//!
//! Configuration lives in a single file at `~/.chatdrive/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (CHATDRIVE_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `CHATDRIVE_BASE_URL` → remote.base_url
//! - `CHATDRIVE_HEADLESS` → browser.headless
//! - `CHATDRIVE_PROFILE_DIR` → browser.profile_dir
//! - `CHATDRIVE_LOG_LEVEL` → observability.log_level
//! - `CHATDRIVE_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".chatdrive"),
        |dirs| dirs.home_dir().join(".chatdrive"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub typing: TypingConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub locators: LocatorConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply `CHATDRIVE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHATDRIVE_BASE_URL") {
            self.remote.base_url = url;
        }
        if let Some(headless) = lookup("CHATDRIVE_HEADLESS") {
            match headless.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.browser.headless = true,
                "0" | "false" | "no" => self.browser.headless = false,
                other => tracing::warn!(value = %other, "Ignoring invalid CHATDRIVE_HEADLESS"),
            }
        }
        if let Some(dir) = lookup("CHATDRIVE_PROFILE_DIR") {
            self.browser.profile_dir = Some(dir);
        }
        if let Some(level) = lookup("CHATDRIVE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("CHATDRIVE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

// ============================================================================
// Remote Application
// ============================================================================

/// Addressing of the remote chat application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Landing page that opens a new conversation.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix under `base_url` that scopes a single conversation.
    #[serde(default = "default_conversation_path")]
    pub conversation_path: String,
}

fn default_base_url() -> String {
    "https://chatgpt.com".into()
}

fn default_conversation_path() -> String {
    "/c/".into()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            conversation_path: default_conversation_path(),
        }
    }
}

// ============================================================================
// Browser
// ============================================================================

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// User data directory. `~` is expanded. When unset, the OS default
    /// Chromium profile is used if one exists.
    #[serde(default)]
    pub profile_dir: Option<String>,

    /// Explicit browser executable; auto-detected when unset.
    #[serde(default)]
    pub executable: Option<String>,

    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// HTTP methods never recorded by the traffic recorder.
    #[serde(default = "default_ignored_methods")]
    pub ignored_methods: Vec<String>,
}

/// Viewport dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn default_true() -> bool {
    true
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

fn default_ignored_methods() -> Vec<String> {
    ["GET", "PATCH", "HEAD", "OPTIONS"]
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            profile_dir: None,
            executable: None,
            viewport: default_viewport(),
            ignored_methods: default_ignored_methods(),
        }
    }
}

impl BrowserConfig {
    /// Profile directory with `~` and environment variables expanded.
    pub fn expanded_profile_dir(&self) -> Option<PathBuf> {
        self.profile_dir.as_deref().map(|dir| {
            let expanded = shellexpand::full(dir).map_or_else(|_| dir.to_string(), |d| d.into_owned());
            PathBuf::from(expanded)
        })
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Inclusive range of seconds a randomized delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A range that never sleeps.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn min(&self) -> Duration {
        secs_to_duration(self.min_secs)
    }

    pub fn max(&self) -> Duration {
        secs_to_duration(self.max_secs.max(self.min_secs))
    }
}

/// Negative and NaN become zero; values too large to represent saturate.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// How message text reaches the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingMode {
    /// Character by character with randomized cadence.
    #[default]
    Humanized,
    /// Content injected in one step.
    Direct,
}

/// Typing cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    #[serde(default)]
    pub mode: TypingMode,

    /// Delay before each character.
    #[serde(default = "default_char_delay")]
    pub char_delay: DelayRange,

    /// Delay after each step of the shift+enter soft-break chord.
    #[serde(default = "default_chord_delay")]
    pub chord_delay: DelayRange,

    /// Pause between direct injection and submission.
    #[serde(default = "default_submit_pause")]
    pub submit_pause: DelayRange,

    /// Hold time between mouse press and release on hover-clicks.
    #[serde(default = "default_hover_hold")]
    pub hover_hold: DelayRange,

    /// Pause for the account menu to react between keyboard steps.
    #[serde(default = "default_menu_pause")]
    pub menu_pause: DelayRange,
}

fn default_char_delay() -> DelayRange {
    DelayRange::new(0.001, 0.5)
}

fn default_chord_delay() -> DelayRange {
    DelayRange::new(0.001, 0.2)
}

fn default_submit_pause() -> DelayRange {
    DelayRange::new(1.0, 2.0)
}

fn default_hover_hold() -> DelayRange {
    DelayRange::new(0.1, 1.0)
}

fn default_menu_pause() -> DelayRange {
    DelayRange::new(0.1, 1.0)
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            mode: TypingMode::default(),
            char_delay: default_char_delay(),
            chord_delay: default_chord_delay(),
            submit_pause: default_submit_pause(),
            hover_hold: default_hover_hold(),
            menu_pause: default_menu_pause(),
        }
    }
}

/// Which signal marks the end of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Watch recorded network exchanges for the status beacon.
    #[default]
    Traffic,
    /// Watch the label of the per-turn action button.
    ControlLabel,
}

/// Completion detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub mode: CompletionMode,

    #[serde(default = "default_signal_method")]
    pub method: String,

    #[serde(default = "default_signal_path")]
    pub path: String,

    /// Key whose presence in the JSON response body means "done".
    #[serde(default = "default_status_field")]
    pub status_field: String,

    #[serde(default = "default_in_progress_label")]
    pub in_progress_label: String,

    #[serde(default = "default_done_label")]
    pub done_label: String,

    /// Pause after the signal so trailing UI updates land.
    #[serde(default = "default_settle")]
    pub settle: DelayRange,
}

fn default_signal_method() -> String {
    "POST".into()
}

fn default_signal_path() -> String {
    "/backend-api/lat/r".into()
}

fn default_status_field() -> String {
    "status".into()
}

fn default_in_progress_label() -> String {
    "Stop generating".into()
}

fn default_done_label() -> String {
    "Regenerate".into()
}

fn default_settle() -> DelayRange {
    DelayRange::new(0.5, 1.0)
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            mode: CompletionMode::default(),
            method: default_signal_method(),
            path: default_signal_path(),
            status_field: default_status_field(),
            in_progress_label: default_in_progress_label(),
            done_label: default_done_label(),
            settle: default_settle(),
        }
    }
}

/// Bounded wait settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Wait for an element to appear.
    #[serde(default = "default_element_secs")]
    pub element_secs: f64,

    /// Wait for the document to become interactive after navigation.
    #[serde(default = "default_ready_secs")]
    pub ready_secs: f64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_element_secs() -> f64 {
    10.0
}

fn default_ready_secs() -> f64 {
    10.0
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            element_secs: default_element_secs(),
            ready_secs: default_ready_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn element_timeout(&self) -> Duration {
        secs_to_duration(self.element_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        secs_to_duration(self.ready_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ============================================================================
// Locators
// ============================================================================

/// CSS selectors for the remote UI. The remote markup changes on its own
/// schedule, so every selector is overridable from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default = "default_input")]
    pub input: String,

    /// Explicit send button; Enter is pressed when it is absent.
    #[serde(default = "default_submit")]
    pub submit: Option<String>,

    /// Per-turn action button whose label reflects generation state.
    #[serde(default = "default_action_button")]
    pub action_button: String,

    #[serde(default = "default_message_entry")]
    pub message_entry: String,

    #[serde(default = "default_role_attribute")]
    pub role_attribute: String,

    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    #[serde(default = "default_profile_button")]
    pub profile_button: String,

    #[serde(default = "default_settings_menu")]
    pub settings_menu: String,

    #[serde(default = "default_menu_entry")]
    pub menu_entry: String,
}

fn default_input() -> String {
    "#prompt-textarea".into()
}

fn default_submit() -> Option<String> {
    Some(r#"button[data-testid="send-button"]"#.into())
}

fn default_action_button() -> String {
    "button.btn:nth-child(1)".into()
}

fn default_message_entry() -> String {
    "div[data-message-author-role]".into()
}

fn default_role_attribute() -> String {
    "data-message-author-role".into()
}

fn default_id_attribute() -> String {
    "data-message-id".into()
}

fn default_profile_button() -> String {
    r#"img[alt="User"]"#.into()
}

fn default_settings_menu() -> String {
    r#"div[id^="headlessui-menu-items"]"#.into()
}

fn default_menu_entry() -> String {
    "a".into()
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            submit: default_submit(),
            action_button: default_action_button(),
            message_entry: default_message_entry(),
            role_attribute: default_role_attribute(),
            id_attribute: default_id_attribute(),
            profile_button: default_profile_button(),
            settings_menu: default_settings_menu(),
            menu_entry: default_menu_entry(),
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to hold at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.remote.base_url, "https://chatgpt.com");
        assert_eq!(config.remote.conversation_path, "/c/");
        assert!(config.browser.headless);
        assert_eq!(config.typing.mode, TypingMode::Humanized);
        assert_eq!(config.completion.mode, CompletionMode::Traffic);
        assert_eq!(config.completion.path, "/backend-api/lat/r");
        assert_eq!(config.timeouts.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.typing.menu_pause, DelayRange::new(0.1, 1.0));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "typing": { "mode": "direct" },
            "completion": { "mode": "control_label", "done_label": "Regenerate response" },
            "locators": { "input": "textarea#prompt-textarea" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.typing.mode, TypingMode::Direct);
        assert_eq!(config.typing.char_delay, DelayRange::new(0.001, 0.5));
        assert_eq!(config.completion.mode, CompletionMode::ControlLabel);
        assert_eq!(config.completion.done_label, "Regenerate response");
        assert_eq!(config.completion.in_progress_label, "Stop generating");
        assert_eq!(config.locators.input, "textarea#prompt-textarea");
        assert_eq!(config.locators.id_attribute, "data-message-id");
    }

    #[test]
    fn test_observability_aliases() {
        let json = r#"{ "observability": { "level": "debug", "format": "json" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHATDRIVE_BASE_URL", "https://chat.example.com"),
            ("CHATDRIVE_HEADLESS", "false"),
            ("CHATDRIVE_PROFILE_DIR", "/tmp/profile"),
            ("CHATDRIVE_LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.remote.base_url, "https://chat.example.com");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.profile_dir.as_deref(), Some("/tmp/profile"));
        assert_eq!(config.observability.log_level, "trace");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_invalid_headless_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|key| (key == "CHATDRIVE_HEADLESS").then(|| "maybe".into()));
        assert!(config.browser.headless);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.typing.mode = TypingMode::Direct;
        config.locators.submit = None;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.typing.mode, TypingMode::Direct);
        assert!(loaded.locators.submit.is_none());
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_delay_range_clamps() {
        let range = DelayRange::new(-1.0, 0.5);
        assert_eq!(range.min(), Duration::ZERO);
        assert_eq!(range.max(), Duration::from_millis(500));

        let inverted = DelayRange::new(2.0, 1.0);
        assert_eq!(inverted.max(), Duration::from_secs(2));
    }

    #[test]
    fn test_huge_timeouts_saturate() {
        let timeouts = TimeoutConfig {
            element_secs: 1e300,
            ready_secs: f64::MAX,
            ..Default::default()
        };
        assert_eq!(timeouts.element_timeout(), Duration::MAX);
        assert_eq!(timeouts.ready_timeout(), Duration::MAX);

        let huge_delay = DelayRange::new(0.0, 1e300);
        assert_eq!(huge_delay.max(), Duration::MAX);
    }

    #[test]
    fn test_expanded_profile_dir() {
        let config = BrowserConfig {
            profile_dir: Some("/opt/profiles/chat".into()),
            ..Default::default()
        };
        assert_eq!(
            config.expanded_profile_dir(),
            Some(PathBuf::from("/opt/profiles/chat"))
        );
        assert!(BrowserConfig::default().expanded_profile_dir().is_none());
    }
}
