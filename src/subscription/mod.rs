//! Provides structures and traits related to subscription management.
//!
//! This module includes the `Disposable` contract with its stock
//! implementations, the `Subscriber` sink that values, errors and completions
//! are delivered into, and `TracingSubscriber`, a subscriber that logs every
//! event it delivers.
pub mod disposable;
pub mod subscribe;
pub mod traced;
