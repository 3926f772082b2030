use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::errors::ErrorPayload;
use crate::observer::Observer;
use crate::subscription::disposable::Disposable;

type NextFn<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn FnOnce(ErrorPayload) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;
type Released = (Option<ErrorFn>, Option<CompleteFn>, Option<Box<dyn Disposable>>);

/// The sink a signal delivers its events into.
///
/// A `Subscriber` receives zero or more values followed by at most one terminal
/// event, an error or a completion. It also owns the disposable of the work
/// feeding it and releases that disposable exactly once, whichever of
/// `put_error`, `put_completion` or `dispose` gets there first.
///
/// `Subscriber` is a handle: clones share the same state, so a producer can
/// hold one clone while the consumer cancels through another.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use sigkit::Subscriber;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_c = Arc::clone(&seen);
///
/// let subscriber = Subscriber::new(
///     move |v: i32| seen_c.lock().unwrap().push(v),
///     |_e| {},
///     || println!("completed"),
/// );
///
/// subscriber.put_next(1);
/// subscriber.put_completion();
/// // Dropped, the subscriber is terminated.
/// subscriber.put_next(2);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
pub struct Subscriber<T> {
    inner: Arc<Mutex<State<T>>>,
}

struct State<T> {
    next_fn: Option<NextFn<T>>,
    error_fn: Option<ErrorFn>,
    complete_fn: Option<CompleteFn>,
    disposable: Option<Box<dyn Disposable>>,
    terminated: bool,
}

impl<T> State<T> {
    // Moves the state to Terminated and hands back what the winner has to
    // run outside of the lock. Returns `None` if already terminated.
    fn terminate(&mut self) -> Option<Released> {
        if self.terminated {
            return None;
        }
        self.terminated = true;
        self.next_fn = None;
        Some((
            self.error_fn.take(),
            self.complete_fn.take(),
            self.disposable.take(),
        ))
    }
}

/// Non-owning reference to a `Subscriber`, for callbacks that need to reach
/// the subscriber they are stored in.
pub(crate) struct WeakSubscriber<T> {
    inner: Weak<Mutex<State<T>>>,
}

impl<T> WeakSubscriber<T> {
    pub(crate) fn upgrade(&self) -> Option<Subscriber<T>> {
        self.inner.upgrade().map(|inner| Subscriber { inner })
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Subscriber<T> {
    /// Creates a new `Subscriber` with functions handling emitted values, the
    /// error and the completion.
    pub fn new(
        next_fn: impl Fn(T) + 'static + Send + Sync,
        error_fn: impl FnOnce(ErrorPayload) + 'static + Send,
        complete_fn: impl FnOnce() + 'static + Send,
    ) -> Self {
        Subscriber {
            inner: Arc::new(Mutex::new(State {
                next_fn: Some(Arc::new(next_fn)),
                error_fn: Some(Box::new(error_fn)),
                complete_fn: Some(Box::new(complete_fn)),
                disposable: None,
                terminated: false,
            })),
        }
    }

    /// Create a new `Subscriber` with only the `next` function. Terminal events
    /// are still honored, they just have nothing to call.
    pub fn on_next(next_fn: impl Fn(T) + 'static + Send + Sync) -> Self {
        Subscriber {
            inner: Arc::new(Mutex::new(State {
                next_fn: Some(Arc::new(next_fn)),
                error_fn: None,
                complete_fn: None,
                disposable: None,
                terminated: false,
            })),
        }
    }

    /// Associates `disposable` with this subscriber. It is released when the
    /// subscriber terminates or is disposed.
    ///
    /// If the subscriber already terminated, `disposable` is disposed on the spot
    /// instead of being stored. This covers producers that finish before the
    /// caller gets to wire up cancellation.
    pub fn assign_disposable(&self, disposable: impl Disposable + 'static) {
        let mut state = self.inner.lock();
        if state.terminated {
            drop(state);
            tracing::trace!("subscriber already terminated, disposing late disposable");
            disposable.dispose();
            return;
        }
        let previous = state.disposable.replace(Box::new(disposable));
        drop(state);
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    /// Terminates the subscriber without disposing its disposable, which is
    /// only released.
    ///
    /// Use when the caller knows the upstream work has already been cleaned up.
    /// After this call every `put_*` and `dispose` is a no-op.
    pub fn mark_terminated_without_disposal(&self) {
        let released = self.inner.lock().terminate();
        // Drop callbacks and the disposable outside of the lock, their
        // destructors may call back into this subscriber.
        drop(released);
    }

    /// Returns `true` once a terminal event was delivered or the subscriber was
    /// disposed. Synchronous producers can poll it to stop early.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.lock().terminated
    }

    pub(crate) fn downgrade(&self) -> WeakSubscriber<T> {
        WeakSubscriber {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // Terminates without terminal callbacks and disposes the associated
    // disposable. Returns `false` if another call already terminated.
    pub(crate) fn cancel(&self) -> bool {
        let Some((_, _, disposable)) = self.inner.lock().terminate() else {
            return false;
        };
        if let Some(disposable) = disposable {
            disposable.dispose();
        }
        true
    }

    /// Delivers a value. Does nothing after termination.
    pub fn put_next(&self, v: T) {
        let next_fn = self.inner.lock().next_fn.clone();
        if let Some(next_fn) = next_fn {
            next_fn(v);
        }
    }

    /// Delivers the terminal error, then disposes the associated disposable.
    pub fn put_error(&self, e: ErrorPayload) {
        let Some((error_fn, _, disposable)) = self.inner.lock().terminate() else {
            return;
        };
        if let Some(error_fn) = error_fn {
            error_fn(e);
        }
        if let Some(disposable) = disposable {
            disposable.dispose();
        }
    }

    /// Delivers the completion, then disposes the associated disposable.
    pub fn put_completion(&self) {
        let Some((_, complete_fn, disposable)) = self.inner.lock().terminate() else {
            return;
        };
        if let Some(complete_fn) = complete_fn {
            complete_fn();
        }
        if let Some(disposable) = disposable {
            disposable.dispose();
        }
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn put_next(&self, v: Self::NextFnType) {
        Subscriber::put_next(self, v);
    }

    fn put_error(&self, e: ErrorPayload) {
        Subscriber::put_error(self, e);
    }

    fn put_completion(&self) {
        Subscriber::put_completion(self);
    }
}

impl<T: 'static> Disposable for Subscriber<T> {
    /// Cancels the subscription from the outside. No terminal callback is
    /// invoked, the associated disposable is disposed.
    fn dispose(&self) {
        self.cancel();
    }
}
