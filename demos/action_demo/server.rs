//! Action server demo: computes a Fibonacci sequence, publishing partial
//! progress as feedback. Run alongside `action_demo/client.rs`.
//!
//! Original action definition:
//! https://docs.ros2.org/latest/api/action_tutorials_interfaces/action/Fibonacci.html

use std::time::Duration;

#[allow(unused_imports)]
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use actionbus::{
  action::{ActionServerQosPolicies, ActionTypes},
  Context, Node, NodeOptions,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FibonacciGoal {
  order: i32,
}
impl actionbus::Message for FibonacciGoal {}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FibonacciResult {
  sequence: Vec<i32>,
}
impl actionbus::Message for FibonacciResult {}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FibonacciFeedback {
  partial_sequence: Vec<i32>,
}
impl actionbus::Message for FibonacciFeedback {}

struct Fibonacci;
impl ActionTypes for Fibonacci {
  type Goal = FibonacciGoal;
  type Result = FibonacciResult;
  type Feedback = FibonacciFeedback;

  fn name() -> &'static str {
    "Fibonacci"
  }
}

fn main() {
  pretty_env_logger::init();
  println!("Press Ctrl-C to quit.");

  let context = Context::new().unwrap();
  let node = context
    .new_node("fibonacci_server", "/demo", NodeOptions::new())
    .unwrap();

  let mut server = node
    .create_action_server::<Fibonacci>(
      "fibonacci",
      ActionServerQosPolicies::default().status_frequency_hz(5.0),
    )
    .unwrap();

  server.register_goal_callback(|handle| {
    if handle.goal().order < 0 {
      handle.reject("order must be non-negative").unwrap();
      return;
    }
    info!("accepting goal for order {}", handle.goal().order);
    handle.accept().unwrap();

    let order = handle.goal().order;
    let mut sequence = vec![0, 1];
    for i in 2..=order.max(1) {
      if handle.is_cancel_requested() {
        handle
          .set_canceled(FibonacciResult { sequence: sequence.clone() }, "canceled")
          .unwrap();
        return;
      }
      let next = sequence[(i - 1) as usize] + sequence[(i - 2) as usize];
      sequence.push(next);
      handle.publish_feedback(FibonacciFeedback {
        partial_sequence: sequence.clone(),
      });
      std::thread::sleep(Duration::from_millis(200));
    }
    handle.set_succeeded(FibonacciResult { sequence }, "done").unwrap();
  });

  server.register_cancel_callback(|id| {
    info!("cancel affected goal {}", id.id);
  });

  let mut handle = server.spin().unwrap();

  let (stop_tx, stop_rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || stop_tx.send(()).unwrap_or(())).expect("Error setting Ctrl-C handler");
  let _ = stop_rx.recv();

  handle.shutdown();
}
