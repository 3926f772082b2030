use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use sigkit::{ActionDisposable, Subscriber};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Next(i32),
    Error(String),
    Completed,
}

/// Builds a subscriber recording every callback it receives, in order.
pub fn register_events_subscriber() -> (Subscriber<i32>, Arc<Mutex<Vec<Event>>>) {
    let events = Arc::new(Mutex::new(Vec::with_capacity(8)));
    let events_n = Arc::clone(&events);
    let events_e = Arc::clone(&events);
    let events_c = Arc::clone(&events);

    let subscriber = Subscriber::new(
        move |v| {
            // Track put_next() calls.
            events_n.lock().unwrap().push(Event::Next(v));
        },
        move |e| {
            // Track put_error() calls.
            events_e.lock().unwrap().push(Event::Error(e.to_string()));
        },
        move || {
            // Track put_completion() calls.
            events_c.lock().unwrap().push(Event::Completed);
        },
    );
    (subscriber, events)
}

/// A disposable counting how many times its logic actually ran.
#[allow(dead_code)]
pub fn tracked_disposable() -> (ActionDisposable, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_c = Arc::clone(&count);
    let d = ActionDisposable::from_fn(move || {
        count_c.fetch_add(1, Ordering::SeqCst);
    });
    (d, count)
}
