//! The client-side comm-state machine.
//!
//! Unlike the server machine, a single observation here can produce a
//! *cascade* of intermediate states when the server's own transitions were
//! not individually observed (e.g. a status array arrives after the goal
//! already succeeded, so the client never literally saw ACTIVE). The
//! cascade tables below are transcribed from `actionlib`'s
//! `client_state_machine.go` `updateStatus`/`TransitionStates` logic.

use crate::action::msgs::ServerState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommState {
  WaitingForGoalAck,
  Pending,
  Active,
  WaitingForResult,
  WaitingForCancelAck,
  Recalling,
  Preempting,
  Done,
  Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidObservation {
  pub from: CommState,
  pub observed: ServerState,
}

use CommState::*;
use ServerState as S;

/// Feeds one observed server status into the machine, returning the ordered
/// list of comm-states visited (the last entry is the new current state).
/// An empty list means "no change" (the observation was absorbed, e.g. a
/// repeated status while already in the matching state).
pub fn observe(from: CommState, observed: ServerState) -> Result<Vec<CommState>, InvalidObservation> {
  let err = || InvalidObservation { from, observed };

  let cascade = match from {
    WaitingForGoalAck => match observed {
      S::Pending => vec![Pending],
      S::Active => vec![Active],
      S::Rejected => vec![Pending, WaitingForResult],
      S::Recalling => vec![Pending, Recalling],
      S::Recalled => vec![Pending, WaitingForResult],
      S::Preempted => vec![Active, Preempting, WaitingForResult],
      S::Succeeded | S::Aborted => vec![Active, WaitingForResult],
      S::Preempting => vec![Active, Preempting],
      S::Lost => return Err(err()),
    },
    Pending => match observed {
      S::Pending => vec![],
      S::Active => vec![Active],
      S::Rejected => vec![WaitingForResult],
      S::Recalling => vec![Recalling],
      S::Recalled => vec![Recalling, WaitingForResult],
      S::Preempted => vec![Active, Preempting, WaitingForResult],
      S::Succeeded | S::Aborted => vec![Active, WaitingForResult],
      S::Preempting => vec![Active, Preempting],
      S::Lost => return Err(err()),
    },
    Active => match observed {
      S::Active => vec![],
      S::Preempted => vec![Preempting, WaitingForResult],
      S::Succeeded | S::Aborted => vec![WaitingForResult],
      S::Preempting => vec![Preempting],
      S::Pending | S::Rejected | S::Recalling | S::Recalled | S::Lost => return Err(err()),
    },
    WaitingForResult => match observed {
      S::Pending | S::Preempting | S::Recalling => return Err(err()),
      _ => vec![],
    },
    WaitingForCancelAck => match observed {
      S::Pending => vec![],
      S::Active => vec![],
      S::Rejected => vec![WaitingForResult],
      S::Recalling => vec![Recalling],
      S::Recalled => vec![Recalling, WaitingForResult],
      S::Preempted => vec![Preempting, WaitingForResult],
      S::Succeeded | S::Aborted => vec![Recalling, WaitingForResult],
      S::Preempting => vec![Preempting],
      S::Lost => return Err(err()),
    },
    Recalling => match observed {
      S::Recalling => vec![],
      S::Rejected | S::Recalled => vec![WaitingForResult],
      S::Preempted | S::Succeeded | S::Aborted => vec![Preempting, WaitingForResult],
      S::Preempting => vec![Preempting],
      S::Pending | S::Active | S::Lost => return Err(err()),
    },
    Preempting => match observed {
      S::Preempting => vec![],
      S::Preempted | S::Succeeded | S::Aborted => vec![WaitingForResult],
      S::Pending | S::Active | S::Rejected | S::Recalling | S::Recalled | S::Lost => {
        return Err(err())
      }
    },
    Done => match observed {
      S::Pending | S::Active | S::Recalling | S::Preempting => return Err(err()),
      _ => vec![],
    },
    Lost => vec![],
  };
  Ok(cascade)
}

/// The goal id was absent from an observed status array. Per the spec,
/// only a client in WAITING_FOR_GOAL_ACK, WAITING_FOR_RESULT, or DONE may
/// legitimately be absent (e.g. the first status tick after sending, or
/// after the result already arrived); any other state is LOST.
pub fn is_lost_when_absent(from: CommState) -> bool {
  !matches!(from, WaitingForGoalAck | WaitingForResult | Done)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn happy_path_cascade() {
    // WAITING_FOR_GOAL_ACK observing ACTIVE then SUCCEEDED.
    assert_eq!(observe(WaitingForGoalAck, S::Active).unwrap(), vec![Active]);
    assert_eq!(
      observe(Active, S::Succeeded).unwrap(),
      vec![WaitingForResult]
    );
  }

  #[test]
  fn skipped_active_status_still_cascades_through_it() {
    // client never saw ACTIVE; server went straight to SUCCEEDED.
    let cascade = observe(WaitingForGoalAck, S::Succeeded).unwrap();
    assert_eq!(cascade, vec![Active, WaitingForResult]);
  }

  #[test]
  fn waiting_for_result_absorbs_everything_else() {
    assert_eq!(observe(WaitingForResult, S::Succeeded).unwrap(), vec![]);
    assert_eq!(observe(WaitingForResult, S::Active).unwrap(), vec![]);
    assert!(observe(WaitingForResult, S::Pending).is_err());
  }

  #[test]
  fn done_rejects_non_terminal_observations() {
    assert!(observe(Done, S::Active).is_err());
    assert_eq!(observe(Done, S::Succeeded).unwrap(), vec![]);
  }

  #[test]
  fn lost_detection() {
    assert!(is_lost_when_absent(Pending));
    assert!(is_lost_when_absent(Active));
    assert!(!is_lost_when_absent(WaitingForGoalAck));
    assert!(!is_lost_when_absent(WaitingForResult));
    assert!(!is_lost_when_absent(Done));
  }
}
