use std::sync::{
  Arc,
  atomic::{
    AtomicI64,
    Ordering,
  },
};

use the_event::{
  Dispatcher,
  LogLogger,
  Subscription,
};

/// A box keeps its own counter and listens to the buttons while it is open.
struct CounterBox {
  id:            usize,
  counter:       Arc<AtomicI64>,
  subscriptions: Vec<Subscription>,
}

impl CounterBox {
  fn open(id: usize, bus: &Dispatcher<()>) -> Self {
    let counter = Arc::new(AtomicI64::new(0));
    let subscriptions = [("minus-one", -1), ("plus-one", 1)]
      .into_iter()
      .map(|(action, delta)| {
        let counter = counter.clone();
        bus.on_named(action, format!("box-{id}"), move |()| {
          counter.fetch_add(delta, Ordering::Relaxed);
          Ok(())
        })
      })
      .collect();

    Self {
      id,
      counter,
      subscriptions,
    }
  }

  fn close(self) {
    for subscription in &self.subscriptions {
      subscription.unsubscribe();
    }
  }
}

fn print_boxes(boxes: &[CounterBox]) {
  let line: Vec<String> = boxes
    .iter()
    .map(|b| format!("[{}: {}]", b.id, b.counter.load(Ordering::Relaxed)))
    .collect();
  println!("{}", line.join(" "));
}

fn main() {
  env_logger::init();

  let bus = Dispatcher::<()>::new().with_logger(LogLogger);
  let mut boxes: Vec<CounterBox> = (0..2).map(|id| CounterBox::open(id, &bus)).collect();

  bus.emit("plus-one", ());
  bus.emit("plus-one", ());
  print_boxes(&boxes);

  boxes.push(CounterBox::open(2, &bus));
  bus.emit("minus-one", ());
  print_boxes(&boxes);

  boxes.remove(0).close();
  bus.emit("plus-one", ());
  print_boxes(&boxes);

  println!(
    "listeners: plus-one={} minus-one={}",
    bus.handlers_count("plus-one"),
    bus.handlers_count("minus-one")
  );
}
