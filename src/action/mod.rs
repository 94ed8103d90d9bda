//! A goal-oriented action layer over five plain publish/subscribe topics,
//! in the style of ROS1's `actionlib`: `goal`, `cancel`, `status`,
//! `feedback`, `result`.
//!
//! The pieces, leaf-first:
//! - [`goal_id`]: node-unique [`msgs::GoalID`] generation.
//! - [`msgs`]: the wire messages.
//! - [`server_state`] / [`client_state`]: the two state machines.
//! - [`server_tracker`] / [`client_tracker`]: the per-side goal tables built
//!   on top of the state machines.
//! - [`server`] / [`client`]: the façades that own the topics and drive the
//!   trackers from incoming messages.
//! - [`simple_server`] / [`simple_client`]: single-active-goal convenience
//!   wrappers over the façades.

pub mod client;
pub mod client_state;
pub mod client_tracker;
pub mod config;
pub mod error;
pub mod goal_id;
pub mod msgs;
pub mod server;
pub mod server_state;
pub mod server_tracker;
pub mod simple_client;
pub mod simple_server;

pub use client::{ActionClient, ClientGoalHandle};
pub use client_state::CommState;
pub use config::{ActionClientOptions, ActionClientQosPolicies, ActionServerOptions, ActionServerQosPolicies};
pub use error::{ConfigError, GoalError};
pub use msgs::{GoalID, GoalStatus, GoalStatusArray, ServerState as GoalStatusCode};
pub use server::{ActionServer, ActionServerHandle, GoalHandle};
pub use simple_client::SimpleActionClient;
pub use simple_server::{SimpleActionServer, SimpleActionServerHandle};

use crate::message::Message;

/// The three payload types an action carries. Implemented once per action
/// (e.g. `Fibonacci`), analogous to `ros2_client`'s own `ActionTypes`.
pub trait ActionTypes {
  type Goal: Message + Clone;
  type Result: Message + Clone;
  type Feedback: Message + Clone;

  /// A short, unique name for this action, used only to build topic wire
  /// type names (e.g. `"Fibonacci"`).
  fn name() -> &'static str;
}

/// Type-name helper used by `Node::create_action_client`/`create_action_server`.
/// Not constructed; its methods are static, keyed by the `A: ActionTypes`
/// type parameter.
pub struct Action<A> {
  _marker: std::marker::PhantomData<A>,
}

impl<A: ActionTypes> Action<A> {
  pub fn goal_type_name() -> String {
    format!("{}/goal", A::name())
  }
  pub fn goal_id_type_name() -> String {
    "actionbus/GoalID".to_string()
  }
  pub fn status_type_name() -> String {
    "actionbus/GoalStatusArray".to_string()
  }
  pub fn feedback_type_name() -> String {
    format!("{}/feedback", A::name())
  }
  pub fn result_type_name() -> String {
    format!("{}/result", A::name())
  }
}
