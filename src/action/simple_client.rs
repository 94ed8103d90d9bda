//! Single-goal ergonomics over [`ActionClient`], in the style of
//! actionlib's `SimpleActionClient`: at most one goal is tracked at a time,
//! addressed implicitly as "the most recently sent goal" rather than via a
//! handle the caller must hold onto. Sending a second goal silently drops
//! tracking of the first, matching upstream (never meant for fleets of
//! concurrent goals).

use std::time::{Duration as StdDuration, Instant};

use crate::action::{
  client::{ActionClient, ClientGoalHandle},
  client_state::CommState,
  error::GoalError,
  msgs::ServerState,
  ActionTypes,
};

pub struct SimpleActionClient<A: ActionTypes + 'static> {
  client: ActionClient<A>,
  current: Option<ClientGoalHandle<A>>,
}

impl<A: ActionTypes + 'static> SimpleActionClient<A> {
  pub fn new(client: ActionClient<A>) -> Self {
    SimpleActionClient {
      client,
      current: None,
    }
  }

  pub fn wait_for_server(&self, timeout: StdDuration) -> bool {
    self.client.wait_for_server(timeout)
  }

  /// Sends a goal, dropping tracking of whatever was previously sent.
  pub fn send_goal(&mut self, goal: A::Goal) {
    self.current = Some(self.client.send_goal(goal));
  }

  /// Sends a goal and blocks (polling at 10 Hz, per spec §5) until it
  /// reaches a terminal comm-state or `timeout` elapses.
  pub fn send_goal_and_wait(&mut self, goal: A::Goal, timeout: StdDuration) -> Option<ServerState> {
    self.send_goal(goal);
    if self.wait_for_result(timeout) {
      self.get_goal_status().ok()
    } else {
      None
    }
  }

  /// Polls at 10 Hz until the current goal's comm-state is DONE or
  /// `timeout` elapses.
  pub fn wait_for_result(&self, timeout: StdDuration) -> bool {
    let Some(handle) = self.current.as_ref() else {
      return false;
    };
    let deadline = Instant::now() + timeout;
    loop {
      if handle.get_comm_state() == Ok(CommState::Done) {
        return true;
      }
      if Instant::now() >= deadline {
        return false;
      }
      std::thread::sleep(StdDuration::from_millis(100));
    }
  }

  pub fn get_state(&self) -> Result<CommState, GoalError> {
    self
      .current
      .as_ref()
      .ok_or(GoalError::HandleExpired)
      .and_then(|h| h.get_comm_state())
  }

  pub fn get_goal_status(&self) -> Result<ServerState, GoalError> {
    self
      .current
      .as_ref()
      .ok_or(GoalError::HandleExpired)
      .and_then(|h| h.get_goal_status())
  }

  pub fn get_result(&self) -> Result<Option<A::Result>, GoalError>
  where
    A::Result: Clone,
  {
    self
      .current
      .as_ref()
      .ok_or(GoalError::HandleExpired)
      .and_then(|h| h.get_result())
  }

  pub fn cancel_goal(&self) -> Result<(), GoalError> {
    self
      .current
      .as_ref()
      .ok_or(GoalError::HandleExpired)
      .and_then(|h| h.cancel())
  }

  pub fn stop_tracking_goal(&mut self) {
    if let Some(handle) = self.current.take() {
      handle.stop_tracking();
    }
  }
}
