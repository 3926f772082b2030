use std::{fmt::Debug, sync::Arc};

use crate::errors::ErrorPayload;
use crate::observer::Observer;
use crate::subscription::disposable::Disposable;
use crate::subscription::subscribe::Subscriber;

/// A `Subscriber` that logs every event it delivers under a name.
///
/// Events are emitted through `tracing` at `DEBUG` level, on the
/// `sigkit::trace` target, before being forwarded to the wrapped callbacks.
/// Values are rendered with `Debug`, errors with `Display`. Events dropped
/// because the subscriber already terminated are not logged.
///
/// ```
/// use sigkit::{Signal, Startable, TracingSubscriber};
///
/// let subscriber = TracingSubscriber::new("thumbnails", |_v: u32| {}, |_e| {}, || {});
/// let _d = Signal::single(7).start(subscriber.into_subscriber());
/// ```
pub struct TracingSubscriber<T> {
    name: Arc<str>,
    inner: Subscriber<T>,
}

impl<T> Clone for TracingSubscriber<T> {
    fn clone(&self) -> Self {
        TracingSubscriber {
            name: Arc::clone(&self.name),
            inner: self.inner.clone(),
        }
    }
}

impl<T: Debug + 'static> TracingSubscriber<T> {
    pub fn new(
        name: impl Into<String>,
        next_fn: impl Fn(T) + 'static + Send + Sync,
        error_fn: impl FnOnce(ErrorPayload) + 'static + Send,
        complete_fn: impl FnOnce() + 'static + Send,
    ) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (name_n, name_e, name_c) = (Arc::clone(&name), Arc::clone(&name), Arc::clone(&name));

        let inner = Subscriber::new(
            move |v: T| {
                tracing::debug!(target: "sigkit::trace", subscriber = %name_n, value = ?v, "next");
                next_fn(v);
            },
            move |e: ErrorPayload| {
                tracing::debug!(target: "sigkit::trace", subscriber = %name_e, error = %e, "error");
                error_fn(e);
            },
            move || {
                tracing::debug!(target: "sigkit::trace", subscriber = %name_c, "completed");
                complete_fn();
            },
        );
        TracingSubscriber { name, inner }
    }
}

impl<T> TracingSubscriber<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plain `Subscriber` carrying the logging callbacks, so the
    /// tracing subscriber can be handed to anything expecting a `Subscriber`.
    #[must_use]
    pub fn into_subscriber(self) -> Subscriber<T> {
        self.inner
    }

    pub fn assign_disposable(&self, disposable: impl Disposable + 'static) {
        self.inner.assign_disposable(disposable);
    }

    pub fn mark_terminated_without_disposal(&self) {
        self.inner.mark_terminated_without_disposal();
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl<T> From<TracingSubscriber<T>> for Subscriber<T> {
    fn from(s: TracingSubscriber<T>) -> Self {
        s.into_subscriber()
    }
}

impl<T> Observer for TracingSubscriber<T> {
    type NextFnType = T;

    fn put_next(&self, v: T) {
        self.inner.put_next(v);
    }

    fn put_error(&self, e: ErrorPayload) {
        self.inner.put_error(e);
    }

    fn put_completion(&self) {
        self.inner.put_completion();
    }
}

impl<T: 'static> Disposable for TracingSubscriber<T> {
    fn dispose(&self) {
        if self.inner.cancel() {
            tracing::debug!(target: "sigkit::trace", subscriber = %self.name, "disposed");
        }
    }
}
