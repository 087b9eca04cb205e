//! Interaction session engine.
//!
//! A [`Session`] binds one automation handle to one remote conversation and
//! sequences the components below:
//!
//! - `driver`: types and submits a message
//! - `completion`: waits for the reply to finish
//! - `extractor`: reads the rendered transcript through the [`MessageStore`]
//! - `account`: account menu navigation

mod account;
mod completion;
mod controller;
mod driver;
mod extractor;
mod message;
mod options;
mod store;

pub use completion::{CompletionStrategy, LabelSignal, TrafficSignal};
pub use controller::{Completion, Session, SessionState};
pub use driver::InputStrategy;
pub use message::{ChatMessage, Role};
pub use options::SessionOptions;
pub use store::MessageStore;
