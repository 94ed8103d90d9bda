//! The server-side goal table: tracks one [`ServerGoalRecord`] per known
//! goal id, enforces the state machine, and produces the periodic
//! [`GoalStatusArray`] snapshot.

use std::collections::HashMap;

use crate::{
  action::{
    msgs::{GoalID, GoalStatus, GoalStatusArray, Header, ServerState},
    server_state::{self, ServerEvent},
  },
  builtin_interfaces::Time,
};

/// One goal as tracked by the server. `goal` is `None` when the record was
/// synthesized from a `cancel` that arrived before the matching `goal`
/// message (spec §4.4).
pub struct ServerGoalRecord<G> {
  pub goal: Option<G>,
  pub status: GoalStatus,
  destruction_deadline: Option<Time>,
}

impl<G> ServerGoalRecord<G> {
  pub fn state(&self) -> ServerState {
    self.status.status
  }
}

/// What the façade should do in response to a tracker mutation. Returned
/// instead of giving records a back-reference to the façade (spec §9,
/// "preferred" resolution of the back-reference open question).
#[derive(Debug)]
pub enum GoalOutcome {
  /// Invoke the user's goal callback for this freshly created record.
  Accepted(GoalID),
  /// A goal arrived that matches an earlier cancel; finalized straight to
  /// RECALLED. No goal callback.
  ImmediatelyRecalled(GoalID),
  /// `goal.id.stamp <= last_cancel_stamp`; finalized straight to RECALLED.
  /// No goal callback.
  StampGated(GoalID),
  /// A duplicate of an already-known, still-live goal; destruction deadline
  /// refreshed, nothing else changes.
  DuplicateRefreshed(GoalID),
}

pub struct ServerGoalTracker<G> {
  order: Vec<String>,
  records: HashMap<String, ServerGoalRecord<G>>,
  last_cancel_stamp: Time,
  status_list_timeout_sec: f64,
}

impl<G> ServerGoalTracker<G> {
  pub fn new(status_list_timeout_sec: f64) -> Self {
    ServerGoalTracker {
      order: Vec::new(),
      records: HashMap::new(),
      last_cancel_stamp: Time::ZERO,
      status_list_timeout_sec,
    }
  }

  pub fn get(&self, id: &str) -> Option<&ServerGoalRecord<G>> {
    self.records.get(id)
  }

  fn arm_if_terminal(now: Time, timeout_sec: f64, status: &GoalStatus) -> Option<Time> {
    if status.status.is_terminal() {
      Some(Time::from_nanos(
        now.to_nanos() + (timeout_sec * 1_000_000_000.0) as i64,
      ))
    } else {
      None
    }
  }

  /// Handles an incoming goal message (spec §4.4 `on_goal`).
  pub fn on_goal(&mut self, goal_id: GoalID, goal: G, now: Time) -> GoalOutcome {
    if let Some(existing) = self.records.get_mut(&goal_id.id) {
      if existing.state() == ServerState::Recalling {
        existing.goal = Some(goal);
        existing.status.status = ServerState::Recalled;
        existing.destruction_deadline =
          Self::arm_if_terminal(now, self.status_list_timeout_sec, &existing.status);
        return GoalOutcome::ImmediatelyRecalled(goal_id);
      }
      existing.destruction_deadline =
        Self::arm_if_terminal(now, self.status_list_timeout_sec, &existing.status);
      return GoalOutcome::DuplicateRefreshed(goal_id);
    }

    let stamp_gated =
      goal_id.stamp != Time::ZERO && goal_id.stamp.to_nanos() <= self.last_cancel_stamp.to_nanos();

    let status = GoalStatus::new(
      goal_id.clone(),
      if stamp_gated {
        ServerState::Recalled
      } else {
        ServerState::Pending
      },
      "",
    );
    let destruction_deadline = Self::arm_if_terminal(now, self.status_list_timeout_sec, &status);

    self.order.push(goal_id.id.clone());
    self.records.insert(
      goal_id.id.clone(),
      ServerGoalRecord {
        goal: Some(goal),
        status,
        destruction_deadline,
      },
    );

    if stamp_gated {
      GoalOutcome::StampGated(goal_id)
    } else {
      GoalOutcome::Accepted(goal_id)
    }
  }

  /// Handles an incoming cancel message (spec §4.4 `on_cancel`). Returns
  /// the ids of every record the cancel actually touched, in order, so the
  /// façade can invoke the cancel callback once per affected record (with
  /// that record's own id, per the §9 open-question resolution).
  pub fn on_cancel(&mut self, cancel_id: GoalID, now: Time) -> Vec<GoalID> {
    let wildcard = cancel_id.is_wildcard();
    let mut affected = Vec::new();

    for id in &self.order {
      let Some(record) = self.records.get_mut(id) else {
        continue;
      };
      let matches = wildcard
        || cancel_id.id == *id
        || (cancel_id.stamp != Time::ZERO && record.status.goal_id.stamp.to_nanos() <= cancel_id.stamp.to_nanos());
      if !matches {
        continue;
      }
      let event = match record.state() {
        ServerState::Pending | ServerState::Active => Some(ServerEvent::CancelRequest),
        _ => None,
      };
      if let Some(event) = event {
        if let Ok(next) = server_state::apply(record.state(), event) {
          record.status.status = next;
          record.destruction_deadline =
            Self::arm_if_terminal(now, self.status_list_timeout_sec, &record.status);
          affected.push(record.status.goal_id.clone());
        }
      }
    }

    if !wildcard && !cancel_id.id.is_empty() && !self.records.contains_key(&cancel_id.id) {
      // Synthesize a RECALLING placeholder so a later goal with this id is
      // immediately recalled (spec §4.4).
      let status = GoalStatus::new(cancel_id.clone(), ServerState::Recalling, "");
      self.order.push(cancel_id.id.clone());
      self.records.insert(
        cancel_id.id.clone(),
        ServerGoalRecord {
          goal: None,
          status,
          destruction_deadline: None,
        },
      );
    }

    if cancel_id.stamp.to_nanos() > self.last_cancel_stamp.to_nanos() {
      self.last_cancel_stamp = cancel_id.stamp;
    }

    affected
  }

  /// Applies a terminal/intermediate event directly to one record (used by
  /// the façade for user-driven `set_succeeded`/`set_aborted`/etc).
  pub fn apply_event(
    &mut self,
    id: &str,
    event: ServerEvent,
    text: impl Into<String>,
    now: Time,
  ) -> Result<ServerState, super::error::GoalError> {
    let record = self
      .records
      .get_mut(id)
      .ok_or_else(|| super::error::GoalError::UnknownGoal(id.to_string()))?;
    let next = server_state::apply(record.state(), event)
      .map_err(|e| super::error::GoalError::InvalidServerTransition {
        from: e.from,
        event: e.event,
      })?;
    record.status.status = next;
    record.status.text = text.into();
    record.destruction_deadline = Self::arm_if_terminal(now, self.status_list_timeout_sec, &record.status);
    Ok(next)
  }

  /// Sweeps expired terminal records and returns the live snapshot, in
  /// insertion order (spec §4.4 `publish_status`, invariant I5).
  pub fn publish_status(&mut self, now: Time) -> GoalStatusArray {
    self.order.retain(|id| {
      let Some(record) = self.records.get(id) else {
        return false;
      };
      let expired = record
        .destruction_deadline
        .map(|d| now.to_nanos() >= d.to_nanos())
        .unwrap_or(false);
      if expired {
        self.records.remove(id);
        false
      } else {
        true
      }
    });

    let status_list = self
      .order
      .iter()
      .filter_map(|id| self.records.get(id).map(|r| r.status.clone()))
      .collect();

    GoalStatusArray {
      header: Header::stamped(now),
      status_list,
    }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> GoalID {
    GoalID {
      stamp: Time::ZERO,
      id: s.to_string(),
    }
  }

  fn id_stamped(s: &str, nanos: i64) -> GoalID {
    GoalID {
      stamp: Time::from_nanos(nanos),
      id: s.to_string(),
    }
  }

  #[test]
  fn accepts_new_goal() {
    let mut t: ServerGoalTracker<i32> = ServerGoalTracker::new(60.0);
    let outcome = t.on_goal(id("g1"), 1, Time::ZERO);
    assert!(matches!(outcome, GoalOutcome::Accepted(_)));
    assert_eq!(t.get("g1").unwrap().state(), ServerState::Pending);
  }

  #[test]
  fn cancel_before_accept_then_goal_arrives_recalled_without_callback() {
    let mut t: ServerGoalTracker<i32> = ServerGoalTracker::new(60.0);
    let affected = t.on_cancel(id("g1"), Time::ZERO);
    assert!(affected.is_empty()); // nothing existed yet to invoke the callback on
    assert_eq!(t.get("g1").unwrap().state(), ServerState::Recalling);

    let outcome = t.on_goal(id("g1"), 1, Time::ZERO);
    assert!(matches!(outcome, GoalOutcome::ImmediatelyRecalled(_)));
    assert_eq!(t.get("g1").unwrap().state(), ServerState::Recalled);
  }

  #[test]
  fn wildcard_cancel_touches_pending_and_active_only() {
    let mut t: ServerGoalTracker<i32> = ServerGoalTracker::new(60.0);
    t.on_goal(id("pending"), 1, Time::ZERO);
    t.on_goal(id("active"), 2, Time::ZERO);
    t.apply_event("active", ServerEvent::Accept, "", Time::ZERO).unwrap();
    t.on_goal(id("done"), 3, Time::ZERO);
    t.apply_event("done", ServerEvent::Accept, "", Time::ZERO).unwrap();
    t.apply_event("done", ServerEvent::Succeed, "", Time::ZERO).unwrap();

    let affected = t.on_cancel(GoalID::wildcard(), Time::ZERO);
    assert_eq!(affected.len(), 2);
    assert_eq!(t.get("pending").unwrap().state(), ServerState::Recalling);
    assert_eq!(t.get("active").unwrap().state(), ServerState::Preempting);
    assert_eq!(t.get("done").unwrap().state(), ServerState::Succeeded);
  }

  #[test]
  fn stamp_gated_cancel_recalls_without_callback() {
    let mut t: ServerGoalTracker<i32> = ServerGoalTracker::new(60.0);
    t.on_cancel(id_stamped("", 100), Time::ZERO); // stamp-only cancel, sets high-water mark
    let outcome = t.on_goal(id_stamped("late", 50), 1, Time::ZERO);
    assert!(matches!(outcome, GoalOutcome::StampGated(_)));
    assert_eq!(t.get("late").unwrap().state(), ServerState::Recalled);
  }

  #[test]
  fn status_retention_expires_after_timeout() {
    let mut t: ServerGoalTracker<i32> = ServerGoalTracker::new(60.0);
    t.on_goal(id("g1"), 1, Time::ZERO);
    t.apply_event("g1", ServerEvent::Accept, "", Time::ZERO).unwrap();
    t.apply_event("g1", ServerEvent::Succeed, "", Time::ZERO).unwrap();

    let at_30 = t.publish_status(Time::from_nanos(30_000_000_000));
    assert_eq!(at_30.status_list.len(), 1);

    let at_61 = t.publish_status(Time::from_nanos(61_000_000_000));
    assert!(at_61.status_list.is_empty());
    assert!(t.is_empty());
  }
}
