//! Network traffic recording.

pub mod recorder;

pub use recorder::ExchangeRecorder;
