//! The server-side per-goal state machine: 8 states, 6 events.

use crate::action::msgs::ServerState;

/// An event applied to a server-side goal record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerEvent {
  Accept,
  Reject,
  CancelRequest,
  Cancel,
  Succeed,
  Abort,
}

/// A transition was attempted that the table in the spec does not define.
/// Terminal states silently ignore every event (idempotent), which is not
/// an error; this only covers genuinely undefined edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidTransition {
  pub from: ServerState,
  pub event: ServerEvent,
}

/// Applies `event` to `from`, returning the next state.
///
/// Terminal states return `Ok(from)` unchanged for every event (idempotent).
/// Non-terminal states return `Err` for an event with no defined edge.
pub fn apply(from: ServerState, event: ServerEvent) -> Result<ServerState, InvalidTransition> {
  use ServerEvent::*;
  use ServerState::*;

  if from.is_terminal() {
    return Ok(from);
  }

  let next = match (from, event) {
    (Pending, Accept) => Active,
    (Pending, Reject) => Rejected,
    (Pending, CancelRequest) => Recalling,
    (Pending, Cancel) => Recalled,

    (Recalling, Accept) => Preempting,
    (Recalling, Reject) => Rejected,
    (Recalling, Cancel) => Recalled,

    (Active, CancelRequest) => Preempting,
    (Active, Cancel) => Preempted,
    (Active, Succeed) => Succeeded,
    (Active, Abort) => Aborted,

    (Preempting, Cancel) => Preempted,
    (Preempting, Succeed) => Succeeded,
    (Preempting, Abort) => Aborted,

    _ => return Err(InvalidTransition { from, event }),
  };
  Ok(next)
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case(ServerState::Pending, ServerEvent::Accept, ServerState::Active)]
  #[test_case(ServerState::Pending, ServerEvent::Reject, ServerState::Rejected)]
  #[test_case(ServerState::Pending, ServerEvent::CancelRequest, ServerState::Recalling)]
  #[test_case(ServerState::Pending, ServerEvent::Cancel, ServerState::Recalled)]
  #[test_case(ServerState::Recalling, ServerEvent::Accept, ServerState::Preempting)]
  #[test_case(ServerState::Recalling, ServerEvent::Reject, ServerState::Rejected)]
  #[test_case(ServerState::Recalling, ServerEvent::Cancel, ServerState::Recalled)]
  #[test_case(ServerState::Active, ServerEvent::CancelRequest, ServerState::Preempting)]
  #[test_case(ServerState::Active, ServerEvent::Cancel, ServerState::Preempted)]
  #[test_case(ServerState::Active, ServerEvent::Succeed, ServerState::Succeeded)]
  #[test_case(ServerState::Active, ServerEvent::Abort, ServerState::Aborted)]
  #[test_case(ServerState::Preempting, ServerEvent::Cancel, ServerState::Preempted)]
  #[test_case(ServerState::Preempting, ServerEvent::Succeed, ServerState::Succeeded)]
  #[test_case(ServerState::Preempting, ServerEvent::Abort, ServerState::Aborted)]
  fn valid_edges(from: ServerState, event: ServerEvent, expect: ServerState) {
    assert_eq!(apply(from, event).unwrap(), expect);
  }

  #[test]
  fn invalid_edge_is_an_error() {
    assert!(apply(ServerState::Pending, ServerEvent::Succeed).is_err());
    assert!(apply(ServerState::Active, ServerEvent::Accept).is_err());
    assert!(apply(ServerState::Recalling, ServerEvent::Succeed).is_err());
  }

  #[test]
  fn terminal_states_are_idempotent() {
    for event in [
      ServerEvent::Accept,
      ServerEvent::Reject,
      ServerEvent::CancelRequest,
      ServerEvent::Cancel,
      ServerEvent::Succeed,
      ServerEvent::Abort,
    ] {
      for state in [
        ServerState::Succeeded,
        ServerState::Aborted,
        ServerState::Preempted,
        ServerState::Rejected,
        ServerState::Recalled,
      ] {
        assert_eq!(apply(state, event).unwrap(), state);
      }
    }
  }
}
