use std::{error::Error, sync::Arc, time::Duration};

/// Terminal error value delivered to a `Subscriber`.
///
/// Producers are free to put any error type in here; the core never inspects,
/// wraps or transforms it.
pub type ErrorPayload = Arc<dyn Error + Send + Sync>;

/// Errors raised by the operators and constructors shipped with this crate.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The source did not terminate within the allotted time.
    #[error("signal timed out after {0:?}")]
    Timeout(Duration),

    /// A timing operator was started outside of a Tokio runtime.
    #[error("signal requires a Tokio runtime but none is running")]
    NoRuntime,

    /// Free-form error, mostly useful for producers and tests.
    #[error("{0}")]
    Message(String),
}

impl SignalError {
    pub fn message(msg: impl Into<String>) -> Self {
        SignalError::Message(msg.into())
    }

    /// Wraps this error into the payload type accepted by `put_error`.
    #[must_use]
    pub fn into_payload(self) -> ErrorPayload {
        Arc::new(self)
    }
}

impl From<SignalError> for ErrorPayload {
    fn from(e: SignalError) -> Self {
        e.into_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SignalError::Timeout(Duration::from_millis(5)).to_string(),
            "signal timed out after 5ms"
        );
        assert_eq!(SignalError::message("x").to_string(), "x");
    }

    #[test]
    fn payload_downcasts_back() {
        let payload: ErrorPayload = SignalError::NoRuntime.into();
        assert_eq!(
            payload.downcast_ref::<SignalError>(),
            Some(&SignalError::NoRuntime)
        );
    }
}
