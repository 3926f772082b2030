//! The `signal` module provides `Signal`, a cold push-based stream driving a
//! `Subscriber`, and the `SignalExt` operators composing signals.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};

use tokio::runtime;

use crate::errors::{ErrorPayload, SignalError};
use crate::subscription::disposable::{
    ActionDisposable, Disposable, DisposableSet, EmptyDisposable, MetaDisposable,
};
use crate::subscription::subscribe::{Subscriber, WeakSubscriber};

type Generator<T> = dyn Fn(Subscriber<T>) -> Arc<dyn Disposable> + Send + Sync;

/// A source of values that can be started any number of times.
///
/// Each `start` runs the generator with a fresh `Subscriber`. The generator
/// pushes events into the subscriber, either right away or later from another
/// thread or task, and returns a `Disposable` that stops its work.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use sigkit::{ActionDisposable, Disposable, Signal, SignalExt, Startable, Subscriber};
///
/// let stopped = Arc::new(Mutex::new(false));
/// let stopped_c = Arc::clone(&stopped);
///
/// let signal = Signal::new(move |subscriber: Subscriber<u32>| {
///     for i in 1..=3 {
///         subscriber.put_next(i);
///     }
///     let stopped = Arc::clone(&stopped_c);
///     ActionDisposable::from_fn(move || *stopped.lock().unwrap() = true)
/// });
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_c = Arc::clone(&seen);
/// let subscription = signal
///     .map(|v| v * 10)
///     .start(Subscriber::on_next(move |v: u32| seen_c.lock().unwrap().push(v)));
///
/// subscription.dispose();
///
/// assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
/// assert!(*stopped.lock().unwrap());
/// ```
pub struct Signal<T> {
    generator: Arc<Generator<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a new `Signal` with the provided generator.
    ///
    /// The generator is invoked on every `start`. The disposable it returns is
    /// assigned to the subscriber, so it is released when the subscriber
    /// terminates, and is also disposed when the subscription is disposed.
    pub fn new<D>(generator: impl Fn(Subscriber<T>) -> D + Send + Sync + 'static) -> Self
    where
        D: Disposable + 'static,
    {
        Signal {
            generator: Arc::new(move |subscriber: Subscriber<T>| {
                Arc::new(generator(subscriber)) as Arc<dyn Disposable>
            }),
        }
    }

    /// Emits `value` and completes.
    pub fn single(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Signal::new(move |subscriber: Subscriber<T>| {
            subscriber.put_next(value.clone());
            subscriber.put_completion();
            EmptyDisposable
        })
    }

    /// Emits every item of `items` in order, then completes. Stops early if
    /// the subscriber is terminated midway.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Signal::new(move |subscriber: Subscriber<T>| {
            for v in items.clone() {
                if subscriber.is_terminated() {
                    break;
                }
                subscriber.put_next(v);
            }
            subscriber.put_completion();
            EmptyDisposable
        })
    }

    /// Fails right away with `error`.
    pub fn fail(error: ErrorPayload) -> Self {
        Signal::new(move |subscriber: Subscriber<T>| {
            subscriber.put_error(Arc::clone(&error));
            EmptyDisposable
        })
    }

    /// Completes right away without emitting.
    #[must_use]
    pub fn complete() -> Self {
        Signal::new(|subscriber: Subscriber<T>| {
            subscriber.put_completion();
            EmptyDisposable
        })
    }

    /// Never emits and never terminates.
    #[must_use]
    pub fn never() -> Self {
        Signal::new(|_: Subscriber<T>| EmptyDisposable)
    }

    /// Starts the signal with a subscriber built from the three callbacks.
    pub fn start_with(
        &self,
        next_fn: impl Fn(T) + 'static + Send + Sync,
        error_fn: impl FnOnce(ErrorPayload) + 'static + Send,
        complete_fn: impl FnOnce() + 'static + Send,
    ) -> SubscriberDisposable<T> {
        self.start(Subscriber::new(next_fn, error_fn, complete_fn))
    }
}

/// A trait for types that can be started, delivering their events into a
/// `Subscriber`.
pub trait Startable {
    /// The type of items emitted.
    type Item;

    /// Starts delivering events into `subscriber`.
    ///
    /// The returned `SubscriberDisposable` cancels the subscription: no further
    /// event reaches the subscriber and the producer's work is disposed.
    fn start(&self, subscriber: Subscriber<Self::Item>) -> SubscriberDisposable<Self::Item>;
}

impl<T: 'static> Startable for Signal<T> {
    type Item = T;

    fn start(&self, subscriber: Subscriber<T>) -> SubscriberDisposable<T> {
        let disposable = (self.generator)(subscriber.clone());
        subscriber.assign_disposable(Arc::clone(&disposable));
        SubscriberDisposable {
            subscriber,
            disposable,
        }
    }
}

/// Handle returned by `start`.
///
/// Disposing it terminates the subscriber without calling any of its terminal
/// callbacks and disposes the producer's disposable.
pub struct SubscriberDisposable<T> {
    subscriber: Subscriber<T>,
    disposable: Arc<dyn Disposable>,
}

impl<T> SubscriberDisposable<T> {
    #[must_use]
    pub fn subscriber(&self) -> &Subscriber<T> {
        &self.subscriber
    }
}

impl<T: 'static> Disposable for SubscriberDisposable<T> {
    fn dispose(&self) {
        self.subscriber.mark_terminated_without_disposal();
        self.disposable.dispose();
    }
}

// Builds the subscriber an operator starts its source with. Values go to
// `next_fn` while `downstream` is active. Once `downstream` is terminated, the
// source subscriber is disposed as well, so a synchronous producer polling
// `is_terminated` stops before its disposable has even been assigned.
fn relay<T, U>(
    downstream: &Subscriber<U>,
    next_fn: impl Fn(T) + Send + Sync + 'static,
    error_fn: impl FnOnce(ErrorPayload) + Send + 'static,
    complete_fn: impl FnOnce() + Send + 'static,
) -> Subscriber<T>
where
    T: 'static,
    U: 'static,
{
    let this: Arc<OnceLock<WeakSubscriber<T>>> = Arc::new(OnceLock::new());
    let this_n = Arc::clone(&this);
    let s_n = downstream.clone();
    let upstream = Subscriber::new(
        move |v: T| {
            if !s_n.is_terminated() {
                next_fn(v);
            }
            if s_n.is_terminated() {
                if let Some(upstream) = this_n.get().and_then(WeakSubscriber::upgrade) {
                    upstream.dispose();
                }
            }
        },
        error_fn,
        complete_fn,
    );
    let _ = this.set(upstream.downgrade());
    upstream
}

// `relay` passing the terminal events on to `downstream` untouched.
fn forward<T, U>(
    downstream: &Subscriber<U>,
    next_fn: impl Fn(T) + Send + Sync + 'static,
) -> Subscriber<T>
where
    T: 'static,
    U: 'static,
{
    let (s_e, s_c) = (downstream.clone(), downstream.clone());
    relay(
        downstream,
        next_fn,
        move |e| s_e.put_error(e),
        move || s_c.put_completion(),
    )
}

/// The `SignalExt` trait provides the operators that can be applied to signals
/// to transform and combine them.
///
/// Every operator returns a new cold `Signal`; nothing runs until it is started.
pub trait SignalExt<T: 'static>: Startable<Item = T> {
    /// Transforms each value with `f`.
    fn map<U, F>(self, f: F) -> Signal<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |s: Subscriber<U>| {
            let f = Arc::clone(&f);
            let s_n = s.clone();
            self.start(forward(&s, move |v: T| s_n.put_next(f(v))))
        })
    }

    /// Only lets through the values for which `predicate` returns `true`.
    fn filter<P>(self, predicate: P) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Signal::new(move |s: Subscriber<T>| {
            let predicate = Arc::clone(&predicate);
            let s_n = s.clone();
            self.start(forward(&s, move |v: T| {
                if predicate(&v) {
                    s_n.put_next(v);
                }
            }))
        })
    }

    /// Drops the first `n` values.
    fn skip(self, n: usize) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Signal::new(move |s: Subscriber<T>| {
            let seen = AtomicUsize::new(0);
            let s_n = s.clone();
            self.start(forward(&s, move |v: T| {
                if seen.fetch_add(1, Ordering::SeqCst) >= n {
                    s_n.put_next(v);
                }
            }))
        })
    }

    /// Emits the first `n` values, then completes and disposes the source.
    ///
    /// `take(0)` completes without starting the source at all.
    fn take(self, n: usize) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Signal::new(move |s: Subscriber<T>| {
            let upstream = Arc::new(MetaDisposable::new());
            if n == 0 {
                s.put_completion();
                return upstream;
            }

            let taken = AtomicUsize::new(0);
            let upstream_c = Arc::clone(&upstream);
            let s_n = s.clone();
            let d = self.start(forward(&s, move |v: T| {
                let i = taken.fetch_add(1, Ordering::SeqCst);
                if i < n {
                    s_n.put_next(v);
                    if i + 1 == n {
                        s_n.put_completion();
                        upstream_c.dispose();
                    }
                }
            }));
            // If the source hit `n` while starting, `upstream` is already
            // disposed and `d` goes right with it.
            upstream.set(d);
            upstream
        })
    }

    /// Continues with `next` once this signal completes. Errors end the whole
    /// chain and `next` is never started.
    fn then(self, next: Signal<T>) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Signal::new(move |s: Subscriber<T>| {
            let first = Arc::new(MetaDisposable::new());
            let second = Arc::new(MetaDisposable::new());

            let next = next.clone();
            let second_c = Arc::clone(&second);
            let (s_n, s_e, s_c) = (s.clone(), s.clone(), s.clone());
            let d = self.start(relay(
                &s,
                move |v: T| s_n.put_next(v),
                move |e| s_e.put_error(e),
                move || {
                    let s_next = s_c.clone();
                    second_c.set(next.start(forward(&s_c, move |v: T| s_next.put_next(v))));
                },
            ));
            first.set(d);

            let set = DisposableSet::new();
            set.add(first);
            set.add(second);
            set
        })
    }

    /// Recovers from an error by continuing with the signal returned by `f`.
    fn catch_error<F>(self, f: F) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(ErrorPayload) -> Signal<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |s: Subscriber<T>| {
            let source = Arc::new(MetaDisposable::new());
            let fallback = Arc::new(MetaDisposable::new());

            let f = Arc::clone(&f);
            let fallback_c = Arc::clone(&fallback);
            let (s_n, s_e, s_c) = (s.clone(), s.clone(), s.clone());
            let d = self.start(relay(
                &s,
                move |v: T| s_n.put_next(v),
                move |e| {
                    let s_next = s_e.clone();
                    fallback_c.set(f(e).start(forward(&s_e, move |v: T| s_next.put_next(v))));
                },
                move || s_c.put_completion(),
            ));
            source.set(d);

            let set = DisposableSet::new();
            set.add(source);
            set.add(fallback);
            set
        })
    }

    /// Starts this signal only after `duration` has elapsed.
    ///
    /// The timer runs on the Tokio runtime that is current when the signal is
    /// started. Disposing before the timer fires means the source never starts.
    /// Started outside of a runtime, the subscriber gets
    /// `SignalError::NoRuntime`.
    fn delay(self, duration: Duration) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        let source = Arc::new(self);
        Signal::new(move |s: Subscriber<T>| {
            let set = DisposableSet::new();
            let Ok(handle) = runtime::Handle::try_current() else {
                s.put_error(SignalError::NoRuntime.into_payload());
                return set;
            };

            let started = Arc::new(MetaDisposable::new());
            let started_c = Arc::clone(&started);
            let source = Arc::clone(&source);
            let timer = handle.spawn(async move {
                tokio::time::sleep(duration).await;
                tracing::trace!(?duration, "delay elapsed, starting source");
                let s_n = s.clone();
                started_c.set(source.start(forward(&s, move |v: T| s_n.put_next(v))));
            });

            set.add(ActionDisposable::from_fn(move || timer.abort()));
            set.add(started);
            set
        })
    }

    /// Fails with `SignalError::Timeout` if this signal delivers nothing
    /// within `duration`. The source is disposed when the timer fires.
    ///
    /// The first event of any kind cancels the timer. Like `delay`, this needs
    /// a Tokio runtime when started.
    fn timeout(self, duration: Duration) -> Signal<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Signal::new(move |s: Subscriber<T>| {
            let set = DisposableSet::new();
            let Ok(handle) = runtime::Handle::try_current() else {
                s.put_error(SignalError::NoRuntime.into_payload());
                return set;
            };

            let upstream = Arc::new(MetaDisposable::new());
            let upstream_c = Arc::clone(&upstream);
            let s_t = s.clone();
            let timer = handle.spawn(async move {
                tokio::time::sleep(duration).await;
                tracing::trace!(?duration, "signal timed out");
                upstream_c.dispose();
                s_t.put_error(SignalError::Timeout(duration).into_payload());
            });
            let timer = Arc::new(ActionDisposable::from_fn(move || timer.abort()));

            let (timer_n, timer_e, timer_c) =
                (Arc::clone(&timer), Arc::clone(&timer), Arc::clone(&timer));
            let (s_n, s_e, s_c) = (s.clone(), s.clone(), s.clone());
            let d = self.start(relay(
                &s,
                move |v: T| {
                    timer_n.dispose();
                    s_n.put_next(v);
                },
                move |e| {
                    timer_e.dispose();
                    s_e.put_error(e);
                },
                move || {
                    timer_c.dispose();
                    s_c.put_completion();
                },
            ));
            upstream.set(d);

            set.add(timer);
            set.add(upstream);
            set
        })
    }
}

impl<S, T: 'static> SignalExt<T> for S where S: Startable<Item = T> {}
