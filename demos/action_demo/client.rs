//! Action client demo: sends a Fibonacci goal, prints feedback as it
//! arrives, and waits for the result. Run alongside `action_demo/server.rs`.

use std::time::Duration;

#[allow(unused_imports)]
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use actionbus::{
  action::{ActionClientQosPolicies, ActionTypes},
  Context, Node, NodeOptions,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FibonacciGoal {
  order: i32,
}
impl actionbus::Message for FibonacciGoal {}

#[derive(Clone, Debug, Serialize, Deserialize)]
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

  let context = Context::new().unwrap();
  let node = context
    .new_node("fibonacci_client", "/demo", NodeOptions::new())
    .unwrap();

  let client = node
    .create_action_client::<Fibonacci>("fibonacci", ActionClientQosPolicies::default())
    .unwrap();

  info!("waiting for the action server...");
  if !client.wait_for_server(Duration::from_secs(10)) {
    error!("no action server found within 10s, sending the goal anyway");
  }

  let handle = client.send_goal_with_callbacks(
    FibonacciGoal { order: 8 },
    Some(Box::new(|handle: &actionbus::action::ClientGoalHandle<Fibonacci>| {
      info!("comm-state: {:?}", handle.get_comm_state());
    })),
    Some(Box::new(|feedback: &FibonacciFeedback| {
      info!("partial sequence: {:?}", feedback.partial_sequence);
    })),
  );

  loop {
    if handle.get_comm_state() == Ok(actionbus::action::CommState::Done) {
      break;
    }
    std::thread::sleep(Duration::from_millis(100));
  }

  match handle.get_result() {
    Ok(Some(result)) => println!("final sequence: {:?}", result.sequence),
    Ok(None) => println!("done, but no result was recorded"),
    Err(e) => println!("error reading result: {e}"),
  }
}
