//! Sinks for handler failures.
//!
//! The dispatcher never surfaces a failing handler to the emitter; the
//! configured [`Logger`] is the only place a failure shows up.

use std::io::{
  self,
  Write,
};

use crate::HandlerError;

/// Receives one call per failed handler invocation.
///
/// `message` names the handler (`"The handler <id> has errored:"`) or states
/// that it was anonymous (`"A handler has errored:"`).
///
/// Any `Fn(&str, &HandlerError)` closure is a logger.
pub trait Logger: Send + Sync {
  fn error(&self, message: &str, error: &HandlerError);
}

impl<F> Logger for F
where
  F: Fn(&str, &HandlerError) + Send + Sync,
{
  fn error(&self, message: &str, error: &HandlerError) {
    (self)(message, error)
  }
}

/// Writes failures to the process's standard error stream.
///
/// This is the dispatcher's default logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
  fn error(&self, message: &str, error: &HandlerError) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{message} {error}");
    if let Some(trace) = error.trace() {
      let _ = writeln!(stderr, "{trace}");
    }
  }
}

/// Forwards failures to the [`log`] facade at `error` level.
///
/// Use this when the host installs a `log` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogger;

impl Logger for LogLogger {
  fn error(&self, message: &str, error: &HandlerError) {
    match error.trace() {
      Some(trace) => log::error!("{message} {error}\n{trace}"),
      None => log::error!("{message} {error}"),
    }
  }
}
