//! Brokers turn the arguments passed to [`Dispatcher::emit`] into the value
//! each handler receives.
//!
//! [`Dispatcher::emit`]: crate::Dispatcher::emit

/// Maps an emitted action and its arguments to a handler's input.
///
/// The broker runs once per handler invocation, inside the same failure
/// isolation as the handler: an `Err` (or a panic) is reported for that
/// handler only.
///
/// Any `Fn(&str, &A) -> anyhow::Result<P>` closure is a broker.
pub trait Broker<A, P>: Send + Sync {
  fn apply(&self, action: &str, args: &A) -> anyhow::Result<P>;
}

impl<A, P, F> Broker<A, P> for F
where
  F: Fn(&str, &A) -> anyhow::Result<P> + Send + Sync,
{
  fn apply(&self, action: &str, args: &A) -> anyhow::Result<P> {
    (self)(action, args)
  }
}

/// Forwards the emitted arguments unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<A> Broker<A, A> for Identity
where
  A: Clone,
{
  fn apply(&self, _action: &str, args: &A) -> anyhow::Result<A> {
    Ok(args.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identity_forwards_arguments() {
    let args = ("hello", "world");
    assert_eq!(Identity.apply("one", &args).unwrap(), args);
  }

  #[test]
  fn closures_are_brokers() {
    let broker =
      |action: &str, args: &u32| -> anyhow::Result<String> { Ok(format!("{action}:{args}")) };
    assert_eq!(Broker::apply(&broker, "one", &7).unwrap(), "one:7");
  }
}
