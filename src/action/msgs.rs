//! Wire messages for the action protocol.
//!
//! Field names and order are significant: these types are serialized the
//! same way their ROS1 `actionlib_msgs` counterparts are, and existing peers
//! rely on that layout.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{builtin_interfaces::Time, message::Message};

/// A ROS-style message header: a timestamp and an (unused here) frame id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
  pub stamp: Time,
  pub frame_id: String,
}
impl Message for Header {}

impl Header {
  pub fn stamped(stamp: Time) -> Self {
    Header {
      stamp,
      frame_id: String::new(),
    }
  }
}

/// Identifies one goal. An empty `id` with a zero `stamp` is the wildcard
/// "every goal".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalID {
  pub stamp: Time,
  pub id: String,
}
impl Message for GoalID {}

impl GoalID {
  pub const fn wildcard() -> Self {
    GoalID {
      stamp: Time::ZERO,
      id: String::new(),
    }
  }

  pub fn is_wildcard(&self) -> bool {
    self.id.is_empty() && self.stamp == Time::ZERO
  }
}

/// Server-side goal status codes. These values are bit-exact compatibility
/// points with existing peers and must not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ServerState {
  Pending = 0,
  Active = 1,
  Preempted = 2,
  Succeeded = 3,
  Aborted = 4,
  Rejected = 5,
  Preempting = 6,
  Recalling = 7,
  Recalled = 8,
  Lost = 9,
}

impl ServerState {
  /// Terminal states never transition further.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      ServerState::Preempted
        | ServerState::Succeeded
        | ServerState::Aborted
        | ServerState::Rejected
        | ServerState::Recalled
    )
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatus {
  pub goal_id: GoalID,
  pub status: ServerState,
  pub text: String,
}
impl Message for GoalStatus {}

impl GoalStatus {
  pub fn new(goal_id: GoalID, status: ServerState, text: impl Into<String>) -> Self {
    GoalStatus {
      goal_id,
      status,
      text: text.into(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatusArray {
  pub header: Header,
  pub status_list: Vec<GoalStatus>,
}
impl Message for GoalStatusArray {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionGoal<G> {
  pub header: Header,
  pub goal_id: GoalID,
  pub goal: G,
}
impl<G: Serialize + serde::de::DeserializeOwned> Message for ActionGoal<G> {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionFeedback<F> {
  pub header: Header,
  pub status: GoalStatus,
  pub feedback: F,
}
impl<F: Serialize + serde::de::DeserializeOwned> Message for ActionFeedback<F> {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResult<R> {
  pub header: Header,
  pub status: GoalStatus,
  pub result: R,
}
impl<R: Serialize + serde::de::DeserializeOwned> Message for ActionResult<R> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wildcard_goal_id() {
    assert!(GoalID::wildcard().is_wildcard());
    assert!(!GoalID {
      stamp: Time::ZERO,
      id: "x".to_string()
    }
    .is_wildcard());
  }

  #[test]
  fn status_codes_match_wire_values() {
    // These constants are a compatibility surface; pin them down explicitly.
    assert_eq!(ServerState::Pending as u8, 0);
    assert_eq!(ServerState::Active as u8, 1);
    assert_eq!(ServerState::Preempted as u8, 2);
    assert_eq!(ServerState::Succeeded as u8, 3);
    assert_eq!(ServerState::Aborted as u8, 4);
    assert_eq!(ServerState::Rejected as u8, 5);
    assert_eq!(ServerState::Preempting as u8, 6);
    assert_eq!(ServerState::Recalling as u8, 7);
    assert_eq!(ServerState::Recalled as u8, 8);
    assert_eq!(ServerState::Lost as u8, 9);
  }

  #[test]
  fn terminal_states() {
    assert!(ServerState::Succeeded.is_terminal());
    assert!(ServerState::Aborted.is_terminal());
    assert!(ServerState::Preempted.is_terminal());
    assert!(ServerState::Rejected.is_terminal());
    assert!(ServerState::Recalled.is_terminal());
    assert!(!ServerState::Pending.is_terminal());
    assert!(!ServerState::Active.is_terminal());
    assert!(!ServerState::Preempting.is_terminal());
    assert!(!ServerState::Recalling.is_terminal());
    assert!(!ServerState::Lost.is_terminal());
  }
}
