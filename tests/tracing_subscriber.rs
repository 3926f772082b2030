use std::{
    io,
    sync::{Arc, Barrier, Mutex},
    thread,
};

use sigkit::{Disposable, Observer, Signal, SignalError, SignalExt, Startable, TracingSubscriber};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

fn capturing_dispatch() -> (tracing::Dispatch, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .without_time()
        .finish();
    (tracing::Dispatch::new(subscriber), captured)
}

fn with_captured_logs(f: impl FnOnce()) -> Vec<String> {
    let (dispatch, captured) = capturing_dispatch();
    tracing::dispatcher::with_default(&dispatch, f);
    captured.lines()
}

#[test]
fn logs_every_delivered_event_with_its_name() {
    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);

    let lines = with_captured_logs(|| {
        let s = TracingSubscriber::new(
            "thumbnails",
            move |v: i32| values_c.lock().unwrap().push(v),
            |_| {},
            || {},
        );
        let _d = Signal::from_iter(vec![1, 2]).start(s.into_subscriber());
    });

    assert_eq!(*values.lock().unwrap(), vec![1, 2]);
    assert_eq!(lines.len(), 3, "unexpected log output: {lines:#?}");
    assert!(lines[0].contains("next") && lines[0].contains("value=1"));
    assert!(lines[1].contains("next") && lines[1].contains("value=2"));
    assert!(lines[2].contains("completed"));
    assert!(lines
        .iter()
        .all(|l| l.contains("sigkit::trace") && l.contains("subscriber=thumbnails")));
}

#[test]
fn logs_error_description() {
    let lines = with_captured_logs(|| {
        let s = TracingSubscriber::new("upload", |_: u8| {}, |_| {}, || {});
        let _d = Signal::<u8>::fail(SignalError::message("disk full").into_payload())
            .map(|v| v)
            .start(s.into_subscriber());
    });

    assert_eq!(lines.len(), 1, "unexpected log output: {lines:#?}");
    assert!(lines[0].contains("error=disk full"));
    assert!(lines[0].contains("subscriber=upload"));
}

#[test]
fn dropped_events_are_not_logged() {
    let lines = with_captured_logs(|| {
        let s = TracingSubscriber::new("cell", |_: i32| {}, |_| {}, || {});
        s.dispose();
        s.put_next(1);
        s.put_completion();
        s.dispose();
    });

    assert_eq!(lines.len(), 1, "unexpected log output: {lines:#?}");
    assert!(lines[0].contains("disposed"));
}

#[test]
fn only_the_winning_terminal_call_is_logged() {
    for _ in 0..50 {
        let (dispatch, captured) = capturing_dispatch();
        let s = TracingSubscriber::new("race", |_: i32| {}, |_| {}, || {});
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let s = s.clone();
                let barrier = Arc::clone(&barrier);
                let dispatch = dispatch.clone();
                thread::spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || {
                        barrier.wait();
                        if i % 2 == 0 {
                            s.dispose();
                        } else {
                            s.put_completion();
                        }
                    });
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let lines = captured.lines();
        assert_eq!(lines.len(), 1, "unexpected log output: {lines:#?}");
        assert!(lines[0].contains("disposed") || lines[0].contains("completed"));
    }
}
