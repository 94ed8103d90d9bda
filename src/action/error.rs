//! Error taxonomy for the action layer.
//!
//! Matches the teacher crate's convention of hand-rolled `Display`/`Error`
//! enums rather than pulling in a derive-macro error crate.

use std::fmt;

use crate::action::{client_state::CommState, msgs::ServerState, server_state::ServerEvent};

/// A protocol violation or invalid user request observed by a goal record.
/// Corresponds to error kinds 1 and 4 in the design: logged and/or returned
/// to the caller, never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoalError {
  /// The server-side state machine has no edge for this event from this
  /// state.
  InvalidServerTransition {
    from: ServerState,
    event: ServerEvent,
  },
  /// The client-side state machine observed a status it cannot reconcile
  /// with its current comm-state.
  InvalidClientObservation {
    from: CommState,
    observed: ServerState,
  },
  /// A result or feedback message referenced a goal id this tracker does
  /// not know about.
  UnknownGoal(String),
  /// A result arrived for a goal whose comm-state was already DONE.
  DuplicateResult(String),
  /// The caller asked for something that requires a still-tracked handle
  /// (e.g. cancel after `stop_tracking_goal`).
  HandleExpired,
}

impl fmt::Display for GoalError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GoalError::InvalidServerTransition { from, event } => {
        write!(f, "no transition for event {event:?} from state {from:?}")
      }
      GoalError::InvalidClientObservation { from, observed } => write!(
        f,
        "client in state {from:?} cannot reconcile observed status {observed:?}"
      ),
      GoalError::UnknownGoal(id) => write!(f, "unknown goal id: {id}"),
      GoalError::DuplicateResult(id) => write!(f, "result already received for goal {id}"),
      GoalError::HandleExpired => write!(f, "goal handle is no longer tracked"),
    }
  }
}

impl std::error::Error for GoalError {}

/// Construction-time configuration error (error kind 5: fatal, returned
/// only from façade construction).
#[derive(Debug)]
pub enum ConfigError {
  Create(rustdds::dds::CreateError),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Create(e) => write!(f, "failed to create action topic: {e}"),
    }
  }
}

impl std::error::Error for ConfigError {}

impl From<rustdds::dds::CreateError> for ConfigError {
  fn from(e: rustdds::dds::CreateError) -> Self {
    ConfigError::Create(e)
  }
}
