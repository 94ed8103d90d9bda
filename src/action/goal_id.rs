//! Node-unique GoalID generation.
//!
//! Format and locking strategy follow the original `actionlib` goal id
//! generator: a per-node monotonic counter combined with the wall-clock
//! time, so ids stay human-readable and sortable by send order.

use std::sync::Mutex;

use crate::{action::msgs::GoalID, builtin_interfaces::Time};

pub struct GoalIdGenerator {
  node_name: String,
  count: Mutex<u64>,
}

impl GoalIdGenerator {
  pub fn new(node_name: impl Into<String>) -> Self {
    GoalIdGenerator {
      node_name: node_name.into(),
      count: Mutex::new(0),
    }
  }

  pub fn next(&self) -> GoalID {
    let mut count = self.count.lock().unwrap();
    *count += 1;
    let stamp = Time::now();
    let nanos = stamp.to_nanos();
    let sec = nanos.div_euclid(1_000_000_000);
    let nsec = nanos.rem_euclid(1_000_000_000);
    GoalID {
      stamp,
      id: format!("{}-{}-{}-{}", self.node_name, *count, sec, nsec),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_monotonically_distinct() {
    let gen = GoalIdGenerator::new("talker");
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a.id, b.id);
    assert!(a.id.starts_with("talker-1-"));
    assert!(b.id.starts_with("talker-2-"));
  }
}
