//! Automation handle abstraction.
//!
//! The session engine drives the page exclusively through
//! [`AutomationHandle`]. A [`HandleFactory`] produces a fresh handle for
//! every `start()`; [`chromium`] provides the CDP-backed implementation.

pub mod chromium;

use crate::error::Result;
use async_trait::async_trait;

pub use chromium::{ChromiumFactory, ChromiumHandle, LaunchOptions};

/// Keys the engine dispatches as explicit down/up events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Shift,
    Tab,
    ArrowDown,
}

impl Key {
    /// DOM `KeyboardEvent.key` value.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Shift => "Shift",
            Self::Tab => "Tab",
            Self::ArrowDown => "ArrowDown",
        }
    }

    /// DOM `KeyboardEvent.code` value.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Shift => "ShiftLeft",
            Self::Tab => "Tab",
            Self::ArrowDown => "ArrowDown",
        }
    }

    /// Windows virtual key code, which Chromium uses to route the event.
    pub const fn virtual_key_code(self) -> i64 {
        match self {
            Self::Enter => 13,
            Self::Shift => 16,
            Self::Tab => 9,
            Self::ArrowDown => 40,
        }
    }

    /// Text inserted by the key-down event, if any.
    pub const fn text(self) -> Option<&'static str> {
        match self {
            Self::Enter => Some("\r"),
            _ => None,
        }
    }
}

/// An outbound request paired with its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub body: Option<Vec<u8>>,
}

impl Exchange {
    /// Response body if one was captured and it is not empty.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }
}

/// One live browsing context.
///
/// Lookups report absence as `Ok(None)` / an empty `Vec`; every `Err` is a
/// genuine handle failure and is never retried by the engine.
#[async_trait]
pub trait AutomationHandle: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<Option<String>>;

    /// Whether the document reached an interactive state.
    async fn is_document_ready(&self) -> Result<bool>;

    async fn find_element(&self, selector: &str) -> Result<Option<Self::Element>>;

    async fn find_elements(&self, selector: &str) -> Result<Vec<Self::Element>>;

    async fn find_child_elements(
        &self,
        parent: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Rendered (visible) text of the element.
    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn hover(&self, element: &Self::Element) -> Result<()>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Primary mouse button down over the element.
    async fn press(&self, element: &Self::Element) -> Result<()>;

    /// Primary mouse button up over the element.
    async fn release(&self, element: &Self::Element) -> Result<()>;

    /// Replace the element's content in one step.
    async fn set_content(&self, element: &Self::Element, text: &str) -> Result<()>;

    async fn key_down(&self, key: Key) -> Result<()>;

    async fn key_up(&self, key: Key) -> Result<()>;

    /// Type one printable character into the focused element.
    async fn insert_char(&self, ch: char) -> Result<()>;

    /// Position of the next exchange to be recorded. Never decreases.
    async fn exchange_count(&self) -> Result<usize>;

    /// Exchanges recorded at or after position `mark`, oldest first.
    async fn exchanges_since(&self, mark: usize) -> Result<Vec<Exchange>>;

    async fn close(&mut self) -> Result<()>;
}

/// Produces automation handles.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    type Handle: AutomationHandle;

    async fn create(&self) -> Result<Self::Handle>;
}
