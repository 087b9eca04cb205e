//! chatdrive-browser - Browser-driven sessions with chat web applications.
//!
//! The [`Session`] engine talks to the page only through the
//! [`AutomationHandle`] trait; [`ChromiumHandle`] is the CDP-backed
//! implementation used by the `ask` binary.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod handle;
pub mod humanize;
pub mod ids;
pub mod network;
pub mod profile;
pub mod session;
pub mod wait;

pub use error::{Result, SessionError};
pub use handle::{
    AutomationHandle, ChromiumFactory, ChromiumHandle, Exchange, HandleFactory, Key, LaunchOptions,
};
pub use ids::{is_uuid_v4, ConversationId, MessageId};
pub use network::ExchangeRecorder;
pub use session::{
    ChatMessage, Completion, CompletionStrategy, InputStrategy, LabelSignal, MessageStore, Role,
    Session, SessionOptions, SessionState, TrafficSignal,
};
