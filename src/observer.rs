use crate::errors::ErrorPayload;

/// A sink for the events of a signal.
///
/// Zero or more `put_next` calls may be followed by at most one terminal
/// event, either `put_error` or `put_completion`. Everything delivered after
/// the terminal event is ignored.
pub trait Observer {
    type NextFnType;

    fn put_next(&self, _: Self::NextFnType);
    fn put_error(&self, _: ErrorPayload);
    fn put_completion(&self);
}
