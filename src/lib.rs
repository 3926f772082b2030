//! Push-based signals built on a small subscriber and disposable contract.
//!
//! A `Signal` is a cold producer. Starting it hands a `Subscriber` to the
//! signal's generator, which delivers zero or more values followed by at most
//! one terminal event, an error or a completion. The generator returns a
//! `Disposable` for the work it started, and the subscriber releases it exactly
//! once: when a terminal event arrives or when the consumer disposes the
//! subscription, whichever happens first.
//!
//! The core is scheduler-agnostic. Events run synchronously on whatever thread
//! the producer calls from. Only the timing operators (`delay`, `timeout`) and
//! `DisposeLogic::Future` use the Tokio runtime.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use sigkit::{Signal, SignalExt, Startable, Subscriber};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_c = Arc::clone(&seen);
//! let done = Arc::new(Mutex::new(false));
//! let done_c = Arc::clone(&done);
//!
//! let _subscription = Signal::from_iter(vec![1, 2, 3, 4, 5])
//!     .filter(|v| v % 2 == 1)
//!     .take(2)
//!     .start(Subscriber::new(
//!         move |v: i32| seen_c.lock().unwrap().push(v),
//!         |e| eprintln!("failed: {e}"),
//!         move || *done_c.lock().unwrap() = true,
//!     ));
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
//! assert!(*done.lock().unwrap());
//! ```
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber itself.
//! `TracingSubscriber` emits a `DEBUG` event per delivered event on the
//! `sigkit::trace` target.

pub mod errors;
pub mod observer;
pub mod signal;
mod subscription;

pub use errors::{ErrorPayload, SignalError};
pub use observer::Observer;
pub use signal::{Signal, SignalExt, Startable, SubscriberDisposable};
pub use subscription::disposable::{
    ActionDisposable, Disposable, DisposableSet, DisposeLogic, EmptyDisposable, MetaDisposable,
};
pub use subscription::subscribe::Subscriber;
pub use subscription::traced::TracingSubscriber;
