//! # the-event
//!
//! A minimal, synchronous publish/subscribe dispatcher.
//!
//! Handlers subscribe to an action name; emitting that action runs every
//! subscribed handler inline, in subscription order. A failing handler is
//! reported to a [`Logger`] and never stops the others from running.
//!
//! ## Core Concepts
//!
//! - **Action**: the string naming an event channel
//! - **Handler**: `Fn(P) -> anyhow::Result<()>`, run on every emit of its
//!   action
//! - **Subscription**: token returned on subscribe; removes exactly that
//!   handler, any number of times
//! - **Broker**: turns the emitted arguments into each handler's input
//! - **Logger**: where handler failures go (stderr by default)
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::{
//!   Arc,
//!   Mutex,
//! };
//!
//! use the_event::Dispatcher;
//!
//! let dispatcher = Dispatcher::<i64>::new();
//! let total = Arc::new(Mutex::new(0));
//!
//! dispatcher.on("add", {
//!   let total = total.clone();
//!   move |amount| {
//!     *total.lock().unwrap() += amount;
//!     Ok(())
//!   }
//! });
//!
//! dispatcher.emit("add", 2);
//! dispatcher.emit("add", 3);
//! dispatcher.emit("unknown", 100);
//!
//! assert_eq!(*total.lock().unwrap(), 5);
//! assert_eq!(dispatcher.handlers_count("add"), 1);
//! assert_eq!(dispatcher.handlers_count("unknown"), 0);
//! ```
//!
//! ## Custom Broker
//!
//! A broker reshapes what handlers receive, e.g. wrapping every payload in a
//! common envelope:
//!
//! ```rust
//! use std::sync::{
//!   Arc,
//!   Mutex,
//! };
//!
//! use the_event::Dispatcher;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Envelope {
//!   action:  String,
//!   payload: Vec<String>,
//! }
//!
//! let dispatcher =
//!   Dispatcher::with_broker(|action: &str, args: &Vec<String>| -> anyhow::Result<Envelope> {
//!     Ok(Envelope {
//!       action:  action.to_string(),
//!       payload: args.clone(),
//!     })
//!   });
//!
//! let received = Arc::new(Mutex::new(Vec::new()));
//! dispatcher.on("one", {
//!   let received = received.clone();
//!   move |envelope: Envelope| {
//!     received.lock().unwrap().push(envelope);
//!     Ok(())
//!   }
//! });
//!
//! dispatcher.emit("one", vec!["hello".to_string(), "world".to_string()]);
//!
//! assert_eq!(*received.lock().unwrap(), vec![Envelope {
//!   action:  "one".to_string(),
//!   payload: vec!["hello".to_string(), "world".to_string()],
//! }]);
//! ```
//!
//! ## Failure Isolation
//!
//! ```rust
//! use the_event::{
//!   Dispatcher,
//!   HandlerError,
//! };
//!
//! let dispatcher = Dispatcher::<()>::new().with_logger(|message: &str, error: &HandlerError| {
//!   assert_eq!(message, "The handler flaky has errored:");
//!   assert_eq!(error.to_string(), "boom");
//! });
//!
//! dispatcher.on_named("tick", "flaky", |()| anyhow::bail!("boom"));
//! dispatcher.emit("tick", ());
//! ```

mod broker;
mod bus;
mod error;
mod logger;

pub use broker::{
  Broker,
  Identity,
};
pub use bus::{
  Dispatcher,
  Subscription,
};
pub use error::HandlerError;
pub use logger::{
  ConsoleLogger,
  LogLogger,
  Logger,
};
pub use the_listmap::Handle;
