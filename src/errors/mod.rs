//! Error values delivered to subscribers.
//!
//! The payload handed to `on_error` callbacks is opaque to this crate: any
//! `Error + Send + Sync` wrapped in an `Arc`. `SignalError` covers the errors the
//! built-in operators produce themselves.
mod signal_errors;

pub use signal_errors::*;
