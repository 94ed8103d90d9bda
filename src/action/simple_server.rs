//! Single-active-goal policy layer over [`ServerGoalTracker`], in the style
//! of actionlib's `SimpleActionServer`: at most one *current* goal and one
//! pending *next* goal. A goal superseded before being accepted, or a
//! current goal preempted by a newer one, is cancelled immediately.
//!
//! Built directly on [`ServerGoalTracker`] rather than on [`super::server::ActionServer`]'s
//! [`super::server::GoalHandle`]: the handle only ever addresses the goal that is currently
//! being accepted, while this façade needs to mutate whichever goal is
//! "current" at arbitrary points (e.g. preempting it when a new one arrives).

use std::time::Duration as StdDuration;

use log::{debug, warn};
use mio::{Events, Poll, PollOpt, Ready, Token};
use mio_extras::{
  channel as mio_channel,
  timer::{Builder as TimerBuilder, Timer},
};

use crate::{
  action::{
    error::GoalError,
    msgs::{ActionFeedback, ActionGoal, ActionResult, GoalID, GoalStatus, GoalStatusArray, ServerState},
    server_state::ServerEvent,
    server_tracker::ServerGoalTracker,
    ActionTypes,
  },
  builtin_interfaces::Time,
  pubsub::{Publisher, Subscription},
};

const TOKEN_GOAL: Token = Token(0);
const TOKEN_CANCEL: Token = Token(1);
const TOKEN_TIMER: Token = Token(2);
const TOKEN_SHUTDOWN: Token = Token(3);

type ExecuteCallback<A> = Box<dyn FnMut(&mut SimpleActionServer<A>, <A as ActionTypes>::Goal) + Send>;
type NotifyCallback = Box<dyn FnMut() + Send>;

pub struct SimpleActionServer<A: ActionTypes> {
  action_name: String,
  node_name: String,
  goal_sub: Subscription<ActionGoal<A::Goal>>,
  cancel_sub: Subscription<GoalID>,
  status_pub: Publisher<GoalStatusArray>,
  feedback_pub: Publisher<ActionFeedback<A::Feedback>>,
  result_pub: Publisher<ActionResult<A::Result>>,
  status_frequency_hz: f64,
  tracker: ServerGoalTracker<A::Goal>,
  current: Option<GoalID>,
  next: Option<GoalID>,
  preempt_requested: bool,
  goal_callback: Option<NotifyCallback>,
  preempt_callback: Option<NotifyCallback>,
  execute_callback: Option<ExecuteCallback<A>>,
}

/// Returned by [`SimpleActionServer::spin`].
pub struct SimpleActionServerHandle {
  shutdown_tx: mio_channel::Sender<()>,
  join: Option<std::thread::JoinHandle<()>>,
}

impl SimpleActionServerHandle {
  pub fn shutdown(&mut self) {
    let _ = self.shutdown_tx.send(());
    if let Some(join) = self.join.take() {
      let _ = join.join();
    }
  }
}

impl<A: ActionTypes + 'static> SimpleActionServer<A>
where
  A::Result: Default,
{
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    action_name: String,
    node_name: String,
    goal_sub: Subscription<ActionGoal<A::Goal>>,
    cancel_sub: Subscription<GoalID>,
    status_pub: Publisher<GoalStatusArray>,
    feedback_pub: Publisher<ActionFeedback<A::Feedback>>,
    result_pub: Publisher<ActionResult<A::Result>>,
    status_frequency_hz: f64,
    status_list_timeout_sec: f64,
  ) -> Self {
    SimpleActionServer {
      action_name,
      node_name,
      goal_sub,
      cancel_sub,
      status_pub,
      feedback_pub,
      result_pub,
      status_frequency_hz,
      tracker: ServerGoalTracker::new(status_list_timeout_sec),
      current: None,
      next: None,
      preempt_requested: false,
      goal_callback: None,
      preempt_callback: None,
      execute_callback: None,
    }
  }

  pub fn action_name(&self) -> &str {
    &self.action_name
  }

  /// Notified once a new goal has superseded/joined the `next` slot. Not
  /// used together with [`Self::register_execute_callback`] (matching
  /// upstream: an execute callback already implies acceptance).
  pub fn register_goal_callback<F>(&mut self, cb: F)
  where
    F: FnMut() + Send + 'static,
  {
    self.goal_callback = Some(Box::new(cb));
  }

  pub fn register_preempt_callback<F>(&mut self, cb: F)
  where
    F: FnMut() + Send + 'static,
  {
    self.preempt_callback = Some(Box::new(cb));
  }

  /// Invoked inline, on the façade's own worker thread, once a goal has
  /// just been accepted. If it returns without moving the goal to a
  /// terminal state, the goal is auto-aborted (spec §4.8).
  pub fn register_execute_callback<F>(&mut self, cb: F)
  where
    F: FnMut(&mut SimpleActionServer<A>, A::Goal) + Send + 'static,
  {
    self.execute_callback = Some(Box::new(cb));
  }

  pub fn is_new_goal_available(&self) -> bool {
    self.next.is_some()
  }

  pub fn is_preempt_requested(&self) -> bool {
    self.preempt_requested
  }

  pub fn is_active(&self) -> bool {
    self
      .current
      .as_ref()
      .and_then(|id| self.tracker.get(&id.id))
      .map(|r| matches!(r.state(), ServerState::Active | ServerState::Preempting))
      .unwrap_or(false)
  }

  /// Promotes `next` to `current`, cancelling the previous `current` if it
  /// was still live. Returns the accepted goal payload.
  pub fn accept_new_goal(&mut self) -> Option<A::Goal> {
    let next_id = self.next.take()?;
    if let Some(prev) = self.current.take() {
      if prev.id != next_id.id {
        self.force_terminal_cancel(&prev.id, "canceled: superseded by a newly accepted goal");
      }
    }
    let now = Time::now();
    let _ = self.tracker.apply_event(&next_id.id, ServerEvent::Accept, "", now);
    let goal = self.tracker.get(&next_id.id).and_then(|r| r.goal.clone());
    self.current = Some(next_id);
    self.preempt_requested = false;
    goal
  }

  fn current_status(&self, status: ServerState, text: impl Into<String>) -> Option<GoalStatus> {
    self.current.as_ref().map(|id| GoalStatus::new(id.clone(), status, text))
  }

  fn finish(&mut self, event: ServerEvent, result: A::Result, text: &str) -> Result<(), GoalError> {
    let id = self.current.clone().ok_or_else(|| GoalError::UnknownGoal(String::new()))?;
    let now = Time::now();
    let next = self.tracker.apply_event(&id.id, event, text, now)?;
    let status = GoalStatus::new(id, next, text);
    if let Err(e) = self.result_pub.publish(ActionResult {
      header: crate::action::msgs::Header::stamped(now),
      status,
      result,
    }) {
      warn!("simple action server '{}' result publish failed: {e:?}", self.action_name);
    }
    self.current = None;
    self.preempt_requested = false;
    Ok(())
  }

  pub fn set_succeeded(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Succeed, result, text)
  }

  pub fn set_aborted(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Abort, result, text)
  }

  pub fn set_preempted(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Cancel, result, text)
  }

  pub fn publish_feedback(&self, feedback: A::Feedback) {
    let Some(status) = self.current_status(ServerState::Active, "") else {
      return;
    };
    if let Err(e) = self.feedback_pub.publish(ActionFeedback {
      header: crate::action::msgs::Header::stamped(Time::now()),
      status,
      feedback,
    }) {
      warn!("simple action server '{}' feedback publish failed: {e:?}", self.action_name);
    }
  }

  /// Applies `cancel_request` then `cancel` back-to-back so the record
  /// reaches a terminal state in one step, matching upstream's
  /// `setCancelled` (which bypasses the intermediate RECALLING/PREEMPTING
  /// tick entirely).
  fn force_terminal_cancel(&mut self, id: &str, text: &str) {
    let now = Time::now();
    if let Some(state) = self.tracker.get(id).map(|r| r.state()) {
      if matches!(state, ServerState::Pending | ServerState::Active) {
        let _ = self.tracker.apply_event(id, ServerEvent::CancelRequest, "", now);
      }
    }
    let _ = self.tracker.apply_event(id, ServerEvent::Cancel, text, now);
  }

  pub fn spin(mut self) -> std::io::Result<SimpleActionServerHandle> {
    let poll = Poll::new()?;
    poll.register(&self.goal_sub, TOKEN_GOAL, Ready::readable(), PollOpt::edge())?;
    poll.register(&self.cancel_sub, TOKEN_CANCEL, Ready::readable(), PollOpt::edge())?;

    let mut timer: Timer<()> = TimerBuilder::default().build();
    let tick = StdDuration::from_secs_f64(1.0 / self.status_frequency_hz.max(0.001));
    timer.set_timeout(tick, ());
    poll.register(&timer, TOKEN_TIMER, Ready::readable(), PollOpt::edge())?;

    let (shutdown_tx, shutdown_rx) = mio_channel::channel::<()>();
    poll.register(&shutdown_rx, TOKEN_SHUTDOWN, Ready::readable(), PollOpt::edge())?;

    let join = std::thread::Builder::new()
      .name(format!("{}-simple-action-server-{}", self.node_name, self.action_name))
      .spawn(move || {
        debug!("simple action server '{}' worker starting", self.action_name);
        let mut events = Events::with_capacity(16);
        'outer: loop {
          if poll.poll(&mut events, None).is_err() {
            break;
          }
          for event in &events {
            match event.token() {
              TOKEN_GOAL => self.drain_goals(),
              TOKEN_CANCEL => self.drain_cancels(),
              TOKEN_TIMER => {
                while timer.poll().is_some() {}
                self.publish_status();
                timer.set_timeout(tick, ());
              }
              TOKEN_SHUTDOWN => {
                self.publish_status();
                break 'outer;
              }
              _ => {}
            }
          }
        }
        debug!("simple action server '{}' worker stopping", self.action_name);
      })?;

    Ok(SimpleActionServerHandle {
      shutdown_tx,
      join: Some(join),
    })
  }

  fn drain_goals(&mut self) {
    loop {
      match self.goal_sub.take() {
        Ok(Some((msg, _info))) => self.handle_goal(msg),
        Ok(None) => break,
        Err(e) => {
          warn!("simple action server '{}' goal read error: {e:?}", self.action_name);
          break;
        }
      }
    }
  }

  fn drain_cancels(&mut self) {
    loop {
      match self.cancel_sub.take() {
        Ok(Some((id, _info))) => self.handle_cancel(id),
        Ok(None) => break,
        Err(e) => {
          warn!("simple action server '{}' cancel read error: {e:?}", self.action_name);
          break;
        }
      }
    }
  }

  fn handle_goal(&mut self, msg: ActionGoal<A::Goal>) {
    let goal_id = msg.goal_id.clone();
    self.tracker.on_goal(goal_id.clone(), msg.goal, Time::now());

    let supersedes_current = self
      .current
      .as_ref()
      .map(|cur| goal_id.stamp.to_nanos() >= cur.stamp.to_nanos())
      .unwrap_or(true);
    if !supersedes_current {
      self.force_terminal_cancel(&goal_id.id, "canceled: an active goal has a later timestamp");
      return;
    }

    if let Some(stale_next) = self.next.take() {
      if stale_next.id != goal_id.id {
        self.force_terminal_cancel(&stale_next.id, "canceled: superseded by a newly received goal");
      }
    }
    self.next = Some(goal_id);

    if self.is_active() {
      self.preempt_requested = true;
      if let Some(cb) = self.preempt_callback.as_mut() {
        cb();
      }
    }
    if let Some(cb) = self.goal_callback.as_mut() {
      cb();
    }

    if let Some(mut cb) = self.execute_callback.take() {
      if let Some(goal) = self.accept_new_goal() {
        cb(self, goal);
        if self.is_active() {
          warn!(
            "simple action server '{}' execute callback returned without a terminal status; auto-aborting",
            self.action_name
          );
          let _ = self.finish_with_text_only("execute callback did not reach a terminal status");
        }
      }
      self.execute_callback = Some(cb);
    }
  }

  /// Aborts whatever is current with no user-supplied result.
  fn finish_with_text_only(&mut self, text: &str) -> Result<(), GoalError> {
    self.set_aborted(A::Result::default(), text)
  }

  fn handle_cancel(&mut self, cancel_id: GoalID) {
    let affected = self.tracker.on_cancel(cancel_id, Time::now());
    if let Some(cur) = self.current.as_ref() {
      if affected.iter().any(|id| id.id == cur.id) {
        self.preempt_requested = true;
        if let Some(cb) = self.preempt_callback.as_mut() {
          cb();
        }
      }
    }
  }

  fn publish_status(&mut self) {
    let array = self.tracker.publish_status(Time::now());
    if let Err(e) = self.status_pub.publish(array) {
      warn!("simple action server '{}' status publish failed: {e:?}", self.action_name);
    }
  }
}
