use std::{
  fmt,
  panic::{
    self,
    AssertUnwindSafe,
  },
  sync::{
    Arc,
    Weak,
  },
};

use parking_lot::Mutex;
use the_listmap::{
  Handle,
  ListMap,
};

use crate::{
  Broker,
  ConsoleLogger,
  HandlerError,
  Identity,
  Logger,
};

type HandlerFn<P> = dyn Fn(P) -> anyhow::Result<()> + Send + Sync;

/// One subscription: the handler plus the optional name used in failure logs.
struct Entry<P> {
  handler:    Box<HandlerFn<P>>,
  handler_id: Option<String>,
}

impl<P> Entry<P> {
  fn failure_message(&self) -> String {
    match &self.handler_id {
      Some(id) => format!("The handler {id} has errored:"),
      None => "A handler has errored:".to_string(),
    }
  }
}

type Registry<P> = Mutex<ListMap<String, Arc<Entry<P>>>>;

/// Removal seam for [`Subscription`], erasing the payload type.
trait Unsubscribe: Send + Sync {
  fn unsubscribe(&self, action: &str, handle: Handle);
}

impl<P> Unsubscribe for Registry<P> {
  fn unsubscribe(&self, action: &str, handle: Handle) {
    if self.lock().remove(action, handle).is_some() {
      log::trace!("unsubscribed handler {handle} from {action:?}");
    }
  }
}

/// Synchronous, in-process publish/subscribe.
///
/// Handlers subscribe to an action name and run, in subscription order, every
/// time that action is emitted. `A` is the type passed to
/// [`emit`](Self::emit); `P` is what the [`Broker`] turns it into for each
/// handler (the same type for the default [`Identity`] broker).
///
/// Cloning a dispatcher yields another handle to the same subscriptions.
/// Handlers may subscribe, unsubscribe and emit on the dispatcher that is
/// currently running them: no lock is held while a handler runs.
///
/// ```rust
/// use std::sync::{
///   Arc,
///   atomic::{
///     AtomicUsize,
///     Ordering,
///   },
/// };
///
/// use the_event::Dispatcher;
///
/// let dispatcher = Dispatcher::<(&str, &str)>::new();
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// let subscription = dispatcher.on("greet", {
///   let calls = calls.clone();
///   move |(greeting, name)| {
///     anyhow::ensure!(greeting == "hello", "unexpected greeting for {name}");
///     calls.fetch_add(1, Ordering::Relaxed);
///     Ok(())
///   }
/// });
///
/// dispatcher.emit("greet", ("hello", "world"));
/// subscription.unsubscribe();
/// dispatcher.emit("greet", ("hello", "world"));
///
/// assert_eq!(calls.load(Ordering::Relaxed), 1);
/// ```
pub struct Dispatcher<A, P = A> {
  registry: Arc<Registry<P>>,
  broker:   Arc<dyn Broker<A, P>>,
  logger:   Arc<dyn Logger>,
}

impl<A, P> Clone for Dispatcher<A, P> {
  fn clone(&self) -> Self {
    Self {
      registry: self.registry.clone(),
      broker:   self.broker.clone(),
      logger:   self.logger.clone(),
    }
  }
}

impl<A> Dispatcher<A>
where
  A: Clone + 'static,
{
  /// A dispatcher that forwards emitted arguments unchanged and reports
  /// failures to stderr.
  pub fn new() -> Self {
    Self::with_broker(Identity)
  }
}

impl<A> Default for Dispatcher<A>
where
  A: Clone + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<A, P> Dispatcher<A, P>
where
  A: 'static,
  P: 'static,
{
  /// A dispatcher whose handlers receive whatever `broker` builds from the
  /// emitted arguments.
  pub fn with_broker(broker: impl Broker<A, P> + 'static) -> Self {
    Self {
      registry: Arc::new(Mutex::new(ListMap::new())),
      broker:   Arc::new(broker),
      logger:   Arc::new(ConsoleLogger),
    }
  }

  /// Replaces the sink handler failures are reported to.
  ///
  /// Clones made before this call keep the previous logger.
  pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
    self.logger = Arc::new(logger);
    self
  }

  /// Subscribes an anonymous handler to `action`.
  pub fn on<F>(&self, action: impl Into<String>, handler: F) -> Subscription
  where
    F: Fn(P) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.subscribe(action.into(), None, Box::new(handler))
  }

  /// Subscribes a handler to `action` under a name.
  ///
  /// The name only appears in failure logs; it does not affect ordering and
  /// does not need to be unique.
  pub fn on_named<F>(
    &self,
    action: impl Into<String>,
    handler_id: impl Into<String>,
    handler: F,
  ) -> Subscription
  where
    F: Fn(P) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.subscribe(action.into(), Some(handler_id.into()), Box::new(handler))
  }

  fn subscribe(
    &self,
    action: String,
    handler_id: Option<String>,
    handler: Box<HandlerFn<P>>,
  ) -> Subscription {
    let entry = Arc::new(Entry {
      handler,
      handler_id,
    });
    let handle = self.registry.lock().add(action.clone(), entry);
    log::trace!("subscribed handler {handle} to {action:?}");

    let registry = Arc::downgrade(&self.registry);
    Subscription {
      registry,
      action,
      handle,
    }
  }

  /// Runs every handler subscribed to `action`, in subscription order.
  ///
  /// Emitting an action nobody listens to does nothing. A handler (or the
  /// broker) that fails or panics is reported to the logger and the remaining
  /// handlers still run. A panic also goes through the process panic hook,
  /// which prints it to stderr unless the host replaced the hook.
  ///
  /// Handlers unsubscribed by an earlier handler of the same emit are skipped;
  /// handlers subscribed during the emit are not run by it.
  pub fn emit(&self, action: &str, args: A) {
    let mut cursor = self.registry.lock().cursor(action);
    let mut visited = 0usize;
    let mut failed = 0usize;
    loop {
      let Some(entry) = self.registry.lock().advance(action, &mut cursor).cloned() else {
        break;
      };
      visited += 1;
      if let Err(err) = self.invoke(action, &args, &entry) {
        failed += 1;
        self.logger.error(&entry.failure_message(), &err);
      }
    }
    log::trace!("emitted {action:?} to {visited} handler(s), {failed} failed");
  }

  fn invoke(&self, action: &str, args: &A, entry: &Entry<P>) -> Result<(), HandlerError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
      let payload = self
        .broker
        .apply(action, args)
        .map_err(HandlerError::Broker)?;
      (entry.handler)(payload).map_err(HandlerError::Handler)
    }));
    outcome.unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
  }

  /// Number of handlers currently subscribed to `action`.
  pub fn handlers_count(&self, action: &str) -> usize {
    self.registry.lock().size(action)
  }
}

impl<A, P> fmt::Debug for Dispatcher<A, P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dispatcher").finish_non_exhaustive()
  }
}

/// Token returned by [`Dispatcher::on`]; removes that one subscription.
///
/// Dropping the token leaves the handler subscribed. The token does not keep
/// the dispatcher alive.
pub struct Subscription {
  registry: Weak<dyn Unsubscribe>,
  action:   String,
  handle:   Handle,
}

impl Subscription {
  /// Removes the handler. Calling this again, or after the dispatcher is
  /// gone, does nothing.
  pub fn unsubscribe(&self) {
    if let Some(registry) = self.registry.upgrade() {
      registry.unsubscribe(&self.action, self.handle);
    }
  }

  pub fn action(&self) -> &str {
    &self.action
  }

  pub fn handle(&self) -> Handle {
    self.handle
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("action", &self.action)
      .field("handle", &self.handle)
      .finish()
  }
}
