//! Runtime options for a [`Session`](super::Session).

use super::completion::{CompletionStrategy, LabelSignal, TrafficSignal};
use super::driver::InputStrategy;
use crate::ids::ConversationId;
use chatdrive_common::{CompletionMode, Config, DelayRange, LocatorConfig, TypingMode};
use std::time::Duration;

/// Everything a session needs besides its handle factory.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_url: String,
    pub conversation_path: String,
    pub locators: LocatorConfig,
    pub input: InputStrategy,
    pub completion: CompletionStrategy,
    /// Pause after a completion signal.
    pub settle: DelayRange,
    /// Hold between mouse press and release on hover-clicks.
    pub hover_hold: DelayRange,
    /// Pause between keyboard steps in the account menu.
    pub menu_pause: DelayRange,
    pub element_timeout: Duration,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        let input = match config.typing.mode {
            TypingMode::Humanized => InputStrategy::Humanized {
                char_delay: config.typing.char_delay,
                chord_delay: config.typing.chord_delay,
            },
            TypingMode::Direct => InputStrategy::Direct {
                submit_pause: config.typing.submit_pause,
            },
        };

        let completion = match config.completion.mode {
            CompletionMode::Traffic => CompletionStrategy::Traffic(TrafficSignal {
                method: config.completion.method.clone(),
                path: config.completion.path.clone(),
                status_field: config.completion.status_field.clone(),
            }),
            CompletionMode::ControlLabel => CompletionStrategy::ControlLabel(LabelSignal {
                selector: config.locators.action_button.clone(),
                in_progress: config.completion.in_progress_label.clone(),
                done: config.completion.done_label.clone(),
            }),
        };

        Self {
            base_url: config.remote.base_url.clone(),
            conversation_path: config.remote.conversation_path.clone(),
            locators: config.locators.clone(),
            input,
            completion,
            settle: config.completion.settle,
            hover_hold: config.typing.hover_hold,
            menu_pause: config.typing.menu_pause,
            element_timeout: config.timeouts.element_timeout(),
            ready_timeout: config.timeouts.ready_timeout(),
            poll_interval: config.timeouts.poll_interval(),
        }
    }

    fn conversation_prefix(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.conversation_path
        )
    }

    /// URL that opens `conversation`, or the landing page for a new one.
    pub fn start_url(&self, conversation: Option<&ConversationId>) -> String {
        match conversation {
            Some(id) => format!("{}{}", self.conversation_prefix(), id),
            None => self.base_url.clone(),
        }
    }

    /// Conversation addressed by `location`, if it is conversation-scoped.
    pub fn conversation_from_location(&self, location: &str) -> Option<ConversationId> {
        let rest = location.strip_prefix(&self.conversation_prefix())?;
        let segment = rest
            .split(|c: char| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default();
        if segment.is_empty() {
            return None;
        }
        ConversationId::parse(segment).ok()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
