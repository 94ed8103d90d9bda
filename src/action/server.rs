//! The action server façade: owns the five topics, drives the
//! [`ServerGoalTracker`] from incoming goal/cancel messages, and publishes
//! status on a fixed cadence.
//!
//! Concurrency model (spec §5): a single worker thread owns the
//! subscriptions, the publishers, and the tracker; it polls them with
//! `mio::Poll` (goal, cancel, the status timer, and a shutdown channel) and
//! runs user callbacks inline. Since user callbacks run on the same thread
//! that owns the publishers, a callback can publish feedback/result
//! directly without any cross-thread synchronization.

use std::time::Duration as StdDuration;

use log::{debug, error, warn};
use mio::{Events, Poll, PollOpt, Ready, Token};
use mio_extras::{channel as mio_channel, timer::{Builder as TimerBuilder, Timer}};

use crate::{
  action::{
    error::GoalError,
    msgs::{ActionFeedback, ActionGoal, ActionResult, GoalID, GoalStatus, ServerState},
    server_state::ServerEvent,
    server_tracker::{GoalOutcome, ServerGoalTracker},
    ActionTypes,
  },
  builtin_interfaces::Time,
  pubsub::{Publisher, Subscription},
};

const TOKEN_GOAL: Token = Token(0);
const TOKEN_CANCEL: Token = Token(1);
const TOKEN_TIMER: Token = Token(2);
const TOKEN_SHUTDOWN: Token = Token(3);

type GoalCallback<A> = Box<dyn FnMut(&mut GoalHandle<A>) + Send>;
type CancelCallback = Box<dyn FnMut(GoalID) + Send>;

/// Handle passed to the goal callback, letting it accept/reject the goal
/// and later report progress/terminal outcomes.
pub struct GoalHandle<'a, A: ActionTypes> {
  id: GoalID,
  goal: &'a A::Goal,
  tracker: &'a mut ServerGoalTracker<A::Goal>,
  feedback_pub: &'a Publisher<ActionFeedback<A::Feedback>>,
  result_pub: &'a Publisher<ActionResult<A::Result>>,
}

impl<'a, A: ActionTypes> GoalHandle<'a, A> {
  pub fn goal_id(&self) -> &GoalID {
    &self.id
  }

  pub fn goal(&self) -> &A::Goal {
    self.goal
  }

  pub fn is_cancel_requested(&self) -> bool {
    matches!(
      self.tracker.get(&self.id.id).map(|r| r.state()),
      Some(ServerState::Preempting) | Some(ServerState::Recalling)
    )
  }

  fn apply(&mut self, event: ServerEvent, text: &str) -> Result<ServerState, GoalError> {
    self
      .tracker
      .apply_event(&self.id.id, event, text, Time::now())
  }

  pub fn accept(&mut self) -> Result<(), GoalError> {
    self.apply(ServerEvent::Accept, "")?;
    Ok(())
  }

  pub fn reject(&mut self, text: &str) -> Result<(), GoalError> {
    self.apply(ServerEvent::Reject, text)?;
    Ok(())
  }

  pub fn publish_feedback(&self, feedback: A::Feedback) {
    let status = self
      .tracker
      .get(&self.id.id)
      .map(|r| r.status.clone())
      .unwrap_or_else(|| GoalStatus::new(self.id.clone(), ServerState::Active, ""));
    if let Err(e) = self.feedback_pub.publish(ActionFeedback {
      header: crate::action::msgs::Header::stamped(Time::now()),
      status,
      feedback,
    }) {
      warn!("failed to publish feedback for goal {}: {e:?}", self.id.id);
    }
  }

  fn finish(&mut self, event: ServerEvent, text: &str, result: A::Result) -> Result<(), GoalError> {
    let status = GoalStatus::new(self.id.clone(), self.apply(event, text)?, text);
    if let Err(e) = self.result_pub.publish(ActionResult {
      header: crate::action::msgs::Header::stamped(Time::now()),
      status,
      result,
    }) {
      warn!("failed to publish result for goal {}: {e:?}", self.id.id);
    }
    Ok(())
  }

  pub fn set_succeeded(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Succeed, text, result)
  }

  pub fn set_aborted(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Abort, text, result)
  }

  pub fn set_canceled(&mut self, result: A::Result, text: &str) -> Result<(), GoalError> {
    self.finish(ServerEvent::Cancel, text, result)
  }
}

pub struct ActionServer<A: ActionTypes> {
  action_name: String,
  node_name: String,
  goal_sub: Subscription<ActionGoal<A::Goal>>,
  cancel_sub: Subscription<GoalID>,
  status_pub: Publisher<crate::action::msgs::GoalStatusArray>,
  feedback_pub: Publisher<ActionFeedback<A::Feedback>>,
  result_pub: Publisher<ActionResult<A::Result>>,
  status_frequency_hz: f64,
  tracker: ServerGoalTracker<A::Goal>,
  goal_callback: Option<GoalCallback<A>>,
  cancel_callback: Option<CancelCallback>,
}

/// Returned by [`ActionServer::spin`]; lets the caller request a clean
/// shutdown from another thread (spec §5).
pub struct ActionServerHandle {
  shutdown_tx: mio_channel::Sender<()>,
  join: Option<std::thread::JoinHandle<()>>,
}

impl ActionServerHandle {
  pub fn shutdown(&mut self) {
    let _ = self.shutdown_tx.send(());
    if let Some(join) = self.join.take() {
      let _ = join.join();
    }
  }
}

impl<A: ActionTypes + 'static> ActionServer<A>
where
  A::Result: Default,
{
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    action_name: String,
    node_name: String,
    goal_sub: Subscription<ActionGoal<A::Goal>>,
    cancel_sub: Subscription<GoalID>,
    status_pub: Publisher<crate::action::msgs::GoalStatusArray>,
    feedback_pub: Publisher<ActionFeedback<A::Feedback>>,
    result_pub: Publisher<ActionResult<A::Result>>,
    status_frequency_hz: f64,
    status_list_timeout_sec: f64,
  ) -> Self {
    ActionServer {
      action_name,
      node_name,
      goal_sub,
      cancel_sub,
      status_pub,
      feedback_pub,
      result_pub,
      status_frequency_hz,
      tracker: ServerGoalTracker::new(status_list_timeout_sec),
      goal_callback: None,
      cancel_callback: None,
    }
  }

  pub fn action_name(&self) -> &str {
    &self.action_name
  }

  /// Registers the callback invoked once per newly accepted-for-consideration
  /// goal (spec §4.6). The callback decides accept/reject via the handle.
  pub fn register_goal_callback<F>(&mut self, cb: F)
  where
    F: FnMut(&mut GoalHandle<A>) + Send + 'static,
  {
    self.goal_callback = Some(Box::new(cb));
  }

  /// Registers the callback invoked once per record a cancel request
  /// actually affects (spec §4.6, §9: argument is the affected record's id).
  pub fn register_cancel_callback<F>(&mut self, cb: F)
  where
    F: FnMut(GoalID) + Send + 'static,
  {
    self.cancel_callback = Some(Box::new(cb));
  }

  /// Starts the worker thread. Consumes the façade; use the returned handle
  /// to shut it down.
  pub fn spin(mut self) -> std::io::Result<ActionServerHandle> {
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
      .name(format!("{}-action-server-{}", self.node_name, self.action_name))
      .spawn(move || {
        debug!("action server '{}' worker starting", self.action_name);
        let mut events = Events::with_capacity(16);
        'outer: loop {
          if poll.poll(&mut events, None).is_err() {
            error!("action server '{}' poll failed", self.action_name);
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
        debug!("action server '{}' worker stopping", self.action_name);
      })?;

    Ok(ActionServerHandle {
      shutdown_tx,
      join: Some(join),
    })
  }

  fn drain_goals(&mut self) {
    loop {
      match self.goal_sub.take() {
        Ok(Some((goal_msg, _info))) => self.handle_goal(goal_msg),
        Ok(None) => break,
        Err(e) => {
          warn!("action server '{}' goal read error: {e:?}", self.action_name);
          break;
        }
      }
    }
  }

  fn drain_cancels(&mut self) {
    loop {
      match self.cancel_sub.take() {
        Ok(Some((cancel_id, _info))) => self.handle_cancel(cancel_id),
        Ok(None) => break,
        Err(e) => {
          warn!("action server '{}' cancel read error: {e:?}", self.action_name);
          break;
        }
      }
    }
  }

  fn handle_goal(&mut self, msg: ActionGoal<A::Goal>) {
    let outcome = self.tracker.on_goal(msg.goal_id.clone(), msg.goal, Time::now());
    match outcome {
      GoalOutcome::Accepted(id) => {
        if let Some(mut cb) = self.goal_callback.take() {
          let goal = self
            .tracker
            .get(&id.id)
            .and_then(|r| r.goal.as_ref())
            .expect("goal just inserted");
          // SAFETY-free approach: re-borrow goal via a raw pointer is avoided by
          // cloning the goal up front isn't possible without Clone bound beyond
          // A::Goal: Clone, which ActionTypes already requires.
          let goal_clone = goal.clone();
          let mut handle = GoalHandle::<A> {
            id: id.clone(),
            goal: &goal_clone,
            tracker: &mut self.tracker,
            feedback_pub: &self.feedback_pub,
            result_pub: &self.result_pub,
          };
          cb(&mut handle);
          self.goal_callback = Some(cb);
        }
      }
      // A goal matching an earlier RECALLING record, or one that's
      // stamp-gated by a wildcard cancel, is finalized straight to RECALLED
      // with no goal callback (spec §4.4) — but the client is still waiting
      // on a result, so one must be published here.
      GoalOutcome::ImmediatelyRecalled(id) | GoalOutcome::StampGated(id) => {
        let status = self
          .tracker
          .get(&id.id)
          .map(|r| r.status.clone())
          .unwrap_or_else(|| GoalStatus::new(id.clone(), ServerState::Recalled, ""));
        if let Err(e) = self.result_pub.publish(ActionResult {
          header: crate::action::msgs::Header::stamped(Time::now()),
          status,
          result: A::Result::default(),
        }) {
          warn!("failed to publish recalled result for goal {}: {e:?}", id.id);
        }
      }
      GoalOutcome::DuplicateRefreshed(_) => {}
    }
  }

  fn handle_cancel(&mut self, cancel_id: GoalID) {
    let affected = self.tracker.on_cancel(cancel_id, Time::now());
    if let Some(cb) = self.cancel_callback.as_mut() {
      for id in affected {
        cb(id);
      }
    }
  }

  fn publish_status(&mut self) {
    let array = self.tracker.publish_status(Time::now());
    if let Err(e) = self.status_pub.publish(array) {
      warn!("action server '{}' status publish failed: {e:?}", self.action_name);
    }
  }
}
