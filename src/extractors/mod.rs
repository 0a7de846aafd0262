//! Inbound request envelope and the extractors handlers use to read it.

mod event;
pub use event::*;
