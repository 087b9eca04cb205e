//! Completion detection.
//!
//! The remote page gives no event when a reply is finished. Two signals are
//! observable instead: a status beacon the page posts once generation ends,
//! and the label of the per-turn action button flipping from "stop" to
//! "regenerate".

use crate::error::Result;
use crate::handle::{AutomationHandle, Exchange};

/// Recorded exchange that marks the end of generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSignal {
    pub method: String,
    pub path: String,
    /// Key whose presence in the JSON response body means "done".
    pub status_field: String,
}

impl TrafficSignal {
    pub fn matches(&self, exchange: &Exchange) -> bool {
        if !exchange.method.eq_ignore_ascii_case(&self.method) {
            return false;
        }
        let path_matches = url::Url::parse(&exchange.url)
            .map(|url| url.path() == self.path)
            .unwrap_or(false);
        if !path_matches {
            return false;
        }
        let Some(body) = exchange.body() else {
            return false;
        };
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => map.contains_key(&self.status_field),
            _ => false,
        }
    }
}

/// Action button label that marks the end of generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSignal {
    pub selector: String,
    pub in_progress: String,
    pub done: String,
}

impl LabelSignal {
    pub fn is_done(&self, label: &str) -> bool {
        !label.contains(&self.in_progress) && label.contains(&self.done)
    }
}

/// Which signal a session waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStrategy {
    Traffic(TrafficSignal),
    ControlLabel(LabelSignal),
}

impl CompletionStrategy {
    /// One look at the page. `since` skips exchanges recorded before the
    /// last submission.
    pub(crate) async fn check<H: AutomationHandle>(&self, handle: &H, since: usize) -> Result<bool> {
        match self {
            Self::Traffic(signal) => {
                let exchanges = handle.exchanges_since(since).await?;
                Ok(exchanges.iter().any(|exchange| signal.matches(exchange)))
            }
            Self::ControlLabel(signal) => {
                let Some(button) = handle.find_element(&signal.selector).await? else {
                    return Ok(false);
                };
                let label = handle.text(&button).await?;
                Ok(signal.is_done(&label))
            }
        }
    }

    pub(crate) fn uses_traffic(&self) -> bool {
        matches!(self, Self::Traffic(_))
    }
}
