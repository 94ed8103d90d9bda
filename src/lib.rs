//! A goal-oriented action layer over a publish/subscribe bus, in the style of
//! ROS1's `actionlib`. The underlying DDS transport,
//! [RustDDS](https://atostek.com/en/products/rustdds/), is native Rust.
//!
//! An *action* is a long-running, cancellable, feedback-producing request
//! between one client and one server, carried on five plain topics
//! (`goal`, `cancel`, `status`, `feedback`, `result`) under a common name
//! prefix. See the [`action`] module for the goal lifecycle machinery.
//!
//! # Example
//!
//! ```no_run
//! use actionbus::*;
//!
//! let context = Context::new().unwrap();
//! let node = context
//!   .new_node("fibonacci_listener", "/", NodeOptions::new())
//!   .unwrap();
//!
//! let chatter_topic = node
//!   .create_topic(
//!     "chatter",
//!     "std_msgs/String".to_string(),
//!     &actionbus::ros2::QosPolicyBuilder::new().build(),
//!   )
//!   .unwrap();
//! let _chatter_subscription = node
//!   .create_subscription::<String>(&chatter_topic, None)
//!   .unwrap();
//! ```

#[macro_use]
extern crate lazy_static;

/// Some builtin interfaces for ROS2-style communication (time, headers).
pub mod builtin_interfaces;

#[doc(hidden)]
pub mod context;

/// The goal-oriented action layer: state machines, trackers, and the
/// client/server façades built on top of them.
pub mod action;

pub mod message;
pub mod message_info;
pub mod names;
#[doc(hidden)]
pub mod pubsub;
pub mod ros_time;

#[doc(hidden)]
pub(crate) mod node;

// Re-exports from crate root to simplify usage
#[doc(inline)]
pub use context::*;
#[doc(inline)]
pub use message::Message;
#[doc(inline)]
pub use message_info::MessageInfo;
#[doc(inline)]
pub use names::MessageTypeName;
#[doc(inline)]
pub use node::*;
#[doc(inline)]
pub use pubsub::*;
#[doc(inline)]
pub use ros_time::{ROSTime, SystemTime};

pub use action::{Action, ActionTypes};

/// Module for re-exports we don't want cluttering the top level.
pub mod ros2 {
  pub use rustdds::{qos::policy, Duration, QosPolicies, QosPolicyBuilder, Timestamp};
  pub use rustdds::dds::{CreateError, ReadError, WaitError, WriteError};
}
