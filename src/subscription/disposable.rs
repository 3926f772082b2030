use std::{future::Future, pin::Pin, sync::Arc};

use parking_lot::Mutex;
use tokio::runtime;

/// A handle to a resource or an in-flight piece of work that can be released.
///
/// `dispose` may be called from any thread and any number of times. Only the
/// first call has an effect, and it never panics.
pub trait Disposable: Send + Sync {
    /// Releases the resource guarded by this disposable.
    fn dispose(&self);
}

impl<D: Disposable + ?Sized> Disposable for Arc<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

impl<D: Disposable + ?Sized> Disposable for Box<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

/// A disposable that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDisposable;

impl Disposable for EmptyDisposable {
    fn dispose(&self) {}
}

/// Enumerates the release strategies an `ActionDisposable` can run.
pub enum DisposeLogic {
    /// No specific release logic.
    Nil,

    /// Release depends on another disposable, which is disposed in turn.
    Wrapped(Box<dyn Disposable>),

    /// Release logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous release logic represented by a future. Use if you need to
    /// spawn `Tokio` tasks or `.await` as a part of the release.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl DisposeLogic {
    fn run(self, runtime_handle: Option<runtime::Handle>) {
        match self {
            DisposeLogic::Nil => (),
            DisposeLogic::Logic(fnc) => fnc(),
            DisposeLogic::Wrapped(disposable) => disposable.dispose(),
            DisposeLogic::Future(future) => match runtime_handle {
                Some(handle) => {
                    handle.spawn(future);
                }
                None => {
                    tracing::warn!(
                        "asynchronous dispose logic created outside of a Tokio runtime, dropping it"
                    );
                }
            },
        }
    }
}

/// Runs its `DisposeLogic` once, on the first call to `dispose`.
///
/// The Tokio runtime that is current at construction is remembered so that
/// `DisposeLogic::Future` can be spawned even when `dispose` is called from a
/// plain OS thread.
pub struct ActionDisposable {
    logic: Mutex<Option<DisposeLogic>>,
    runtime_handle: Option<runtime::Handle>,
}

impl ActionDisposable {
    #[must_use]
    pub fn new(logic: DisposeLogic) -> Self {
        ActionDisposable {
            logic: Mutex::new(Some(logic)),
            runtime_handle: runtime::Handle::try_current().ok(),
        }
    }

    /// Shorthand for `DisposeLogic::Logic`.
    pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
        Self::new(DisposeLogic::Logic(Box::new(f)))
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.logic.lock().is_none()
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        let logic = self.logic.lock().take();
        if let Some(logic) = logic {
            logic.run(self.runtime_handle.clone());
        }
    }
}

/// A composite that disposes all of its children, in the order they were added.
#[derive(Default)]
pub struct DisposableSet {
    state: Mutex<SetState>,
}

#[derive(Default)]
struct SetState {
    children: Vec<Box<dyn Disposable>>,
    disposed: bool,
}

impl DisposableSet {
    #[must_use]
    pub fn new() -> Self {
        DisposableSet::default()
    }

    /// Registers `d` with the set. If the set was already disposed, `d` is
    /// disposed right away.
    pub fn add(&self, d: impl Disposable + 'static) {
        let mut state = self.state.lock();
        if state.disposed {
            drop(state);
            d.dispose();
        } else {
            state.children.push(Box::new(d));
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

impl Disposable for DisposableSet {
    fn dispose(&self) {
        let children = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.children)
        };
        for child in children {
            child.dispose();
        }
    }
}

/// Holds at most one disposable, which can be replaced.
///
/// Replacing disposes the previous value. After `dispose`, anything that is
/// `set` is disposed immediately.
#[derive(Default)]
pub struct MetaDisposable {
    state: Mutex<MetaState>,
}

#[derive(Default)]
struct MetaState {
    current: Option<Box<dyn Disposable>>,
    disposed: bool,
}

impl MetaDisposable {
    #[must_use]
    pub fn new() -> Self {
        MetaDisposable::default()
    }

    pub fn set(&self, d: impl Disposable + 'static) {
        let mut state = self.state.lock();
        if state.disposed {
            drop(state);
            d.dispose();
            return;
        }
        let previous = state.current.replace(Box::new(d));
        drop(state);
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

impl Disposable for MetaDisposable {
    fn dispose(&self) {
        let current = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.current.take()
        };
        if let Some(current) = current {
            current.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting() -> (Arc<AtomicUsize>, ActionDisposable) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_c = Arc::clone(&count);
        let d = ActionDisposable::from_fn(move || {
            count_c.fetch_add(1, Ordering::SeqCst);
        });
        (count, d)
    }

    #[test]
    fn action_runs_once() {
        let (count, d) = counting();
        assert!(!d.is_disposed());
        d.dispose();
        d.dispose();
        d.dispose();
        assert!(d.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrapped_forwards() {
        let (count, inner) = counting();
        let d = ActionDisposable::new(DisposeLogic::Wrapped(Box::new(inner)));
        d.dispose();
        d.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn future_without_runtime_is_dropped() {
        let d = ActionDisposable::new(DisposeLogic::Future(Box::pin(async {
            unreachable!("no runtime to spawn on");
        })));
        d.dispose();
        assert!(d.is_disposed());
    }

    #[test]
    fn set_disposes_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let set = DisposableSet::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            set.add(ActionDisposable::from_fn(move || {
                order.lock().unwrap().push(i);
            }));
        }
        set.dispose();
        set.dispose();
        assert!(set.is_disposed());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);

        let (count, late) = counting();
        set.add(late);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn meta_replaces_and_disposes_previous() {
        let meta = MetaDisposable::new();
        let (first_count, first) = counting();
        let (second_count, second) = counting();

        meta.set(first);
        assert_eq!(first_count.load(Ordering::SeqCst), 0);
        meta.set(second);
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 0);

        meta.dispose();
        meta.dispose();
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        let (late_count, late) = counting();
        meta.set(late);
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }
}
