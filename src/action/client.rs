//! The action client façade: owns the five topics, a [`GoalIdGenerator`],
//! and a [`ClientGoalTracker`] shared with a background worker thread that
//! demultiplexes incoming status/feedback/result messages.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::{Duration as StdDuration, Instant},
};

use log::warn;
use mio::{Events, Poll, PollOpt, Ready, Token};
use mio_extras::channel as mio_channel;

use crate::{
  action::{
    client_state::CommState,
    client_tracker::ClientGoalTracker,
    error::GoalError,
    goal_id::GoalIdGenerator,
    msgs::{ActionFeedback, ActionGoal, ActionResult, GoalID, GoalStatusArray, ServerState},
    ActionTypes,
  },
  builtin_interfaces::Time,
  pubsub::{Publisher, Subscription},
};

const TOKEN_STATUS: Token = Token(0);
const TOKEN_FEEDBACK: Token = Token(1);
const TOKEN_RESULT: Token = Token(2);
const TOKEN_SHUTDOWN: Token = Token(3);

/// Invoked once per intermediate comm-state, with the handle as argument so
/// the callback can query `get_comm_state`/`get_goal_status`/`get_result`
/// (spec §4.3, matches the original's callback shape).
type TransitionCallback<A> = Box<dyn FnMut(&ClientGoalHandle<A>) + Send>;
type FeedbackCallback<A> = Box<dyn FnMut(&<A as ActionTypes>::Feedback) + Send>;

struct GoalCallbacks<A: ActionTypes> {
  transition: Option<TransitionCallback<A>>,
  feedback: Option<FeedbackCallback<A>>,
}

struct ClientState<A: ActionTypes> {
  tracker: ClientGoalTracker<A::Goal, A::Result>,
  callbacks: HashMap<String, GoalCallbacks<A>>,
}

struct Shared<A: ActionTypes> {
  action_name: String,
  goal_id_gen: GoalIdGenerator,
  goal_pub: Publisher<ActionGoal<A::Goal>>,
  cancel_pub: Publisher<GoalID>,
  status_sub: Arc<Mutex<Subscription<GoalStatusArray>>>,
  feedback_sub: Arc<Mutex<Subscription<ActionFeedback<A::Feedback>>>>,
  result_sub: Arc<Mutex<Subscription<ActionResult<A::Result>>>>,
  state: Mutex<ClientState<A>>,
}

pub struct ActionClient<A: ActionTypes> {
  shared: Arc<Shared<A>>,
  shutdown_tx: mio_channel::Sender<()>,
  join: Option<std::thread::JoinHandle<()>>,
}

/// A handle to one sent goal. Remains valid even after the goal's record
/// has been pruned from the tracker (spec §3: "may outlive the tracker
/// entry"); operations on an expired handle return [`GoalError::HandleExpired`].
pub struct ClientGoalHandle<A: ActionTypes> {
  shared: Arc<Shared<A>>,
  id: GoalID,
}

impl<A: ActionTypes + 'static> ClientGoalHandle<A> {
  pub fn goal_id(&self) -> &GoalID {
    &self.id
  }

  pub fn get_comm_state(&self) -> Result<CommState, GoalError> {
    let state = self.shared.state.lock().unwrap();
    state
      .tracker
      .get(&self.id.id)
      .map(|r| r.comm_state)
      .ok_or(GoalError::HandleExpired)
  }

  pub fn get_goal_status(&self) -> Result<ServerState, GoalError> {
    let state = self.shared.state.lock().unwrap();
    state
      .tracker
      .get(&self.id.id)
      .map(|r| r.latest_status.status)
      .ok_or(GoalError::HandleExpired)
  }

  pub fn get_result(&self) -> Result<Option<A::Result>, GoalError>
  where
    A::Result: Clone,
  {
    let state = self.shared.state.lock().unwrap();
    state
      .tracker
      .get(&self.id.id)
      .map(|r| r.result.clone())
      .ok_or(GoalError::HandleExpired)
  }

  /// Publishes a cancel targeting just this goal.
  pub fn cancel(&self) -> Result<(), GoalError> {
    {
      let mut state = self.shared.state.lock().unwrap();
      state.tracker.request_cancel(&self.id.id)?;
    }
    if let Err(e) = self.shared.cancel_pub.publish(self.id.clone()) {
      warn!("failed to publish cancel for goal {}: {e:?}", self.id.id);
    }
    Ok(())
  }

  pub fn stop_tracking(&self) {
    let mut state = self.shared.state.lock().unwrap();
    state.tracker.stop_tracking(&self.id.id);
    state.callbacks.remove(&self.id.id);
  }
}

impl<A: ActionTypes + 'static> ActionClient<A> {
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    action_name: String,
    node_name: String,
    goal_pub: Publisher<ActionGoal<A::Goal>>,
    cancel_pub: Publisher<GoalID>,
    status_sub: Subscription<GoalStatusArray>,
    feedback_sub: Subscription<ActionFeedback<A::Feedback>>,
    result_sub: Subscription<ActionResult<A::Result>>,
  ) -> Self {
    let status_sub = Arc::new(Mutex::new(status_sub));
    let feedback_sub = Arc::new(Mutex::new(feedback_sub));
    let result_sub = Arc::new(Mutex::new(result_sub));

    let shared = Arc::new(Shared {
      action_name: action_name.clone(),
      goal_id_gen: GoalIdGenerator::new(node_name.clone()),
      goal_pub,
      cancel_pub,
      status_sub: status_sub.clone(),
      feedback_sub: feedback_sub.clone(),
      result_sub: result_sub.clone(),
      state: Mutex::new(ClientState {
        tracker: ClientGoalTracker::new(),
        callbacks: HashMap::new(),
      }),
    });

    let worker_shared = shared.clone();
    let (shutdown_tx, shutdown_rx) = mio_channel::channel::<()>();

    let join = std::thread::Builder::new()
      .name(format!("{node_name}-action-client-{action_name}"))
      .spawn(move || {
        let poll = match Poll::new() {
          Ok(p) => p,
          Err(e) => {
            warn!("action client '{action_name}' failed to create poller: {e:?}");
            return;
          }
        };
        {
          let guard = status_sub.lock().unwrap();
          let _ = poll.register(&*guard, TOKEN_STATUS, Ready::readable(), PollOpt::edge());
        }
        {
          let guard = feedback_sub.lock().unwrap();
          let _ = poll.register(&*guard, TOKEN_FEEDBACK, Ready::readable(), PollOpt::edge());
        }
        {
          let guard = result_sub.lock().unwrap();
          let _ = poll.register(&*guard, TOKEN_RESULT, Ready::readable(), PollOpt::edge());
        }
        let _ = poll.register(&shutdown_rx, TOKEN_SHUTDOWN, Ready::readable(), PollOpt::edge());

        let mut events = Events::with_capacity(16);
        'outer: loop {
          if poll.poll(&mut events, None).is_err() {
            break;
          }
          for event in &events {
            match event.token() {
              TOKEN_STATUS => {
                while let Ok(Some((array, _info))) = status_sub.lock().unwrap().take() {
                  let mut state = worker_shared.state.lock().unwrap();
                  let transitions = state.tracker.on_status_array(&array);
                  for t in transitions {
                    if let Some(mut cb) = state
                      .callbacks
                      .get_mut(&t.goal_id.id)
                      .and_then(|c| c.transition.take())
                    {
                      let handle = ClientGoalHandle {
                        shared: worker_shared.clone(),
                        id: t.goal_id.clone(),
                      };
                      drop(state);
                      cb(&handle);
                      state = worker_shared.state.lock().unwrap();
                      if let Some(c) = state.callbacks.get_mut(&t.goal_id.id) {
                        c.transition = Some(cb);
                      }
                    }
                  }
                }
              }
              TOKEN_FEEDBACK => {
                while let Ok(Some((msg, _info))) = feedback_sub.lock().unwrap().take() {
                  let mut state = worker_shared.state.lock().unwrap();
                  let tracked = state.tracker.on_feedback(&msg.status.goal_id.id, &msg.feedback).is_some();
                  if tracked {
                    if let Some(cb) = state
                      .callbacks
                      .get_mut(&msg.status.goal_id.id)
                      .and_then(|c| c.feedback.as_mut())
                    {
                      cb(&msg.feedback);
                    }
                  }
                }
              }
              TOKEN_RESULT => {
                while let Ok(Some((msg, _info))) = result_sub.lock().unwrap().take() {
                  let mut state = worker_shared.state.lock().unwrap();
                  if let Ok(t) = state.tracker.on_result(msg.status, msg.result) {
                    if let Some(mut cb) = state
                      .callbacks
                      .get_mut(&t.goal_id.id)
                      .and_then(|c| c.transition.take())
                    {
                      let handle = ClientGoalHandle {
                        shared: worker_shared.clone(),
                        id: t.goal_id.clone(),
                      };
                      drop(state);
                      cb(&handle);
                      state = worker_shared.state.lock().unwrap();
                      if let Some(c) = state.callbacks.get_mut(&t.goal_id.id) {
                        c.transition = Some(cb);
                      }
                    }
                  }
                }
              }
              TOKEN_SHUTDOWN => break 'outer,
              _ => {}
            }
          }
        }
      })
      .expect("failed to spawn action client worker thread");

    ActionClient {
      shared,
      shutdown_tx,
      join: Some(join),
    }
  }

  pub fn action_name(&self) -> &str {
    &self.shared.action_name
  }

  /// Polls until all five topics (goal, cancel, status, feedback, result)
  /// have at least one matched peer, or `timeout` elapses (spec §4.7).
  pub fn wait_for_server(&self, timeout: StdDuration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      let matched = self.shared.goal_pub.matched_subscriber_count() > 0
        && self.shared.cancel_pub.matched_subscriber_count() > 0
        && self.shared.status_sub.lock().unwrap().matched_publisher_count() > 0
        && self.shared.feedback_sub.lock().unwrap().matched_publisher_count() > 0
        && self.shared.result_sub.lock().unwrap().matched_publisher_count() > 0;
      if matched {
        return true;
      }
      if Instant::now() >= deadline {
        return false;
      }
      std::thread::sleep(StdDuration::from_millis(100));
    }
  }

  /// Publishes a new goal and begins tracking it.
  pub fn send_goal(&self, goal: A::Goal) -> ClientGoalHandle<A> {
    self.send_goal_with_callbacks(goal, None, None)
  }

  pub fn send_goal_with_callbacks(
    &self,
    goal: A::Goal,
    transition: Option<TransitionCallback<A>>,
    feedback: Option<FeedbackCallback<A>>,
  ) -> ClientGoalHandle<A> {
    let goal_id = self.shared.goal_id_gen.next();
    {
      let mut state = self.shared.state.lock().unwrap();
      state.tracker.track(goal_id.clone(), goal.clone());
      state
        .callbacks
        .insert(goal_id.id.clone(), GoalCallbacks { transition, feedback });
    }
    if let Err(e) = self.shared.goal_pub.publish(ActionGoal {
      header: crate::action::msgs::Header::stamped(Time::now()),
      goal_id: goal_id.clone(),
      goal,
    }) {
      warn!("failed to publish goal {}: {e:?}", goal_id.id);
    }
    ClientGoalHandle {
      shared: self.shared.clone(),
      id: goal_id,
    }
  }

  /// Publishes a wildcard cancel (spec §4.7).
  pub fn cancel_all_goals(&self) {
    if let Err(e) = self.shared.cancel_pub.publish(GoalID::wildcard()) {
      warn!("failed to publish wildcard cancel: {e:?}");
    }
  }

  /// Publishes a stamp-only cancel (spec §4.7).
  pub fn cancel_all_goals_before(&self, stamp: Time) {
    let cancel = GoalID { stamp, id: String::new() };
    if let Err(e) = self.shared.cancel_pub.publish(cancel) {
      warn!("failed to publish stamp-gated cancel: {e:?}");
    }
  }
}

impl<A: ActionTypes> Drop for ActionClient<A> {
  fn drop(&mut self) {
    let _ = self.shutdown_tx.send(());
    if let Some(join) = self.join.take() {
      let _ = join.join();
    }
  }
}
