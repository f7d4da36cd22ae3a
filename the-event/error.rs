use std::{
  any::Any,
  backtrace::BacktraceStatus,
  fmt::Write,
};

use thiserror::Error;

/// Why a single handler invocation failed.
///
/// These never reach the caller of [`Dispatcher::emit`](crate::Dispatcher::emit);
/// they are handed to the dispatcher's [`Logger`](crate::Logger) and dispatch
/// moves on to the next handler.
#[derive(Debug, Error)]
pub enum HandlerError {
  /// The handler returned an error.
  #[error(transparent)]
  Handler(anyhow::Error),

  /// The broker failed to produce the handler's arguments.
  #[error("broker failed: {0}")]
  Broker(anyhow::Error),

  /// The handler or the broker panicked.
  ///
  /// The panic is caught, but the process panic hook still runs first: with
  /// the default hook the message and location go to stderr, outside of the
  /// dispatcher's logger. Install a hook with [`std::panic::set_hook`] to
  /// route or silence it.
  #[error("handler panicked: {0}")]
  Panicked(String),
}

impl HandlerError {
  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
      (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
      message.clone()
    } else {
      "non-string panic payload".to_string()
    };
    Self::Panicked(message)
  }

  /// Diagnostic trace for the failure, without the message itself: one
  /// `Caused by:` line per underlying cause, then the backtrace when one was
  /// captured (`RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`).
  ///
  /// `None` when there is nothing beyond the message. Panics never carry a
  /// trace; their location is reported by the panic hook.
  pub fn trace(&self) -> Option<String> {
    let err = match self {
      Self::Handler(err) | Self::Broker(err) => err,
      Self::Panicked(_) => return None,
    };

    let mut trace = String::new();
    for cause in err.chain().skip(1) {
      let _ = writeln!(trace, "Caused by: {cause}");
    }
    let backtrace = err.backtrace();
    if backtrace.status() == BacktraceStatus::Captured {
      let _ = writeln!(trace, "{backtrace}");
    }

    let trace = trace.trim_end();
    (!trace.is_empty()).then(|| trace.to_string())
  }
}

#[cfg(test)]
mod tests {
  use std::panic::{
    self,
    UnwindSafe,
  };

  use super::*;

  fn payload_of(f: impl FnOnce() + UnwindSafe) -> Box<dyn Any + Send> {
    match panic::catch_unwind(f) {
      Ok(()) => unreachable!("closure was expected to panic"),
      Err(payload) => payload,
    }
  }

  #[test]
  fn handler_error_displays_the_source_message() {
    let err = HandlerError::Handler(anyhow::anyhow!("foo error"));
    assert_eq!(err.to_string(), "foo error");
    assert!(!err.trace().unwrap_or_default().contains("foo error"));
  }

  #[test]
  fn trace_lists_causes_below_the_message() {
    let err = HandlerError::Broker(anyhow::anyhow!("foo error").context("outer"));
    assert_eq!(err.to_string(), "broker failed: outer");

    let trace = err.trace().unwrap_or_default();
    assert!(trace.starts_with("Caused by: foo error"));
    assert!(!trace.contains("outer"));
  }

  #[test]
  fn panics_have_no_trace() {
    let err = HandlerError::Panicked("boom".to_string());
    assert_eq!(err.trace(), None);
  }

  #[test]
  fn panic_payloads_become_messages() {
    let payload = payload_of(|| panic!("static message"));
    assert_eq!(
      HandlerError::from_panic(payload).to_string(),
      "handler panicked: static message"
    );

    let payload = payload_of(|| panic!("formatted {}", 42));
    assert_eq!(
      HandlerError::from_panic(payload).to_string(),
      "handler panicked: formatted 42"
    );
  }
}
