//! Action layer configuration: QoS policy bundles and the
//! `ActionServerOptions`/`ActionClientOptions` builders.
//!
//! Mirrors the builder pattern `NodeOptions` uses elsewhere in this crate.

use rustdds::{policy::*, QosPolicies, QosPolicyBuilder};

/// Default status publication rate, in Hz.
pub const DEFAULT_STATUS_FREQUENCY_HZ: f64 = 5.0;
/// Default retention of terminal goal records, in seconds, past reaching a
/// terminal state.
pub const DEFAULT_STATUS_LIST_TIMEOUT_SEC: f64 = 60.0;
/// Default bound on the inbound work channel and outbound publish queues.
pub const DEFAULT_QUEUE_SIZE: usize = 50;

fn reliable_transient_local_qos(depth: i32) -> QosPolicies {
  QosPolicyBuilder::new()
    .reliability(Reliability::Reliable {
      max_blocking_time: rustdds::Duration::from_millis(100),
    })
    .history(History::KeepLast { depth })
    .durability(Durability::TransientLocal)
    .build()
}

fn best_effort_qos(depth: i32) -> QosPolicies {
  QosPolicyBuilder::new()
    .reliability(Reliability::BestEffort)
    .history(History::KeepLast { depth })
    .durability(Durability::Volatile)
    .build()
}

/// QoS policies for each of an action client's five topics.
#[derive(Clone)]
pub struct ActionClientQosPolicies {
  pub goal: QosPolicies,
  pub cancel: QosPolicies,
  pub status: QosPolicies,
  pub feedback: QosPolicies,
  pub result: QosPolicies,
}

impl Default for ActionClientQosPolicies {
  fn default() -> Self {
    ActionClientQosPolicies {
      goal: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
      cancel: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
      status: best_effort_qos(1),
      feedback: best_effort_qos(DEFAULT_QUEUE_SIZE as i32),
      result: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
    }
  }
}

impl ActionClientQosPolicies {
  /// Resize the depth of the published (`goal`, `cancel`) and subscribed
  /// (`status`, `feedback`, `result`) topics from an [`ActionClientOptions`].
  /// `status` keeps depth 1 regardless, since only the latest status array
  /// matters.
  pub fn with_queue_sizes(mut self, opts: &ActionClientOptions) -> Self {
    self.goal = reliable_transient_local_qos(opts.pub_queue_size as i32);
    self.cancel = reliable_transient_local_qos(opts.pub_queue_size as i32);
    self.feedback = best_effort_qos(opts.sub_queue_size as i32);
    self.result = reliable_transient_local_qos(opts.sub_queue_size as i32);
    self
  }
}

/// QoS policies for each of an action server's five topics, plus the
/// status-publication cadence and goal-record retention window.
#[derive(Clone)]
pub struct ActionServerQosPolicies {
  pub goal: QosPolicies,
  pub cancel: QosPolicies,
  pub status: QosPolicies,
  pub feedback: QosPolicies,
  pub result: QosPolicies,
  pub status_frequency_hz: f64,
  pub status_list_timeout_sec: f64,
}

impl Default for ActionServerQosPolicies {
  fn default() -> Self {
    ActionServerQosPolicies {
      goal: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
      cancel: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
      status: best_effort_qos(1),
      feedback: best_effort_qos(DEFAULT_QUEUE_SIZE as i32),
      result: reliable_transient_local_qos(DEFAULT_QUEUE_SIZE as i32),
      status_frequency_hz: DEFAULT_STATUS_FREQUENCY_HZ,
      status_list_timeout_sec: DEFAULT_STATUS_LIST_TIMEOUT_SEC,
    }
  }
}

impl ActionServerQosPolicies {
  pub fn status_frequency_hz(mut self, hz: f64) -> Self {
    self.status_frequency_hz = hz;
    self
  }

  pub fn status_list_timeout_sec(mut self, sec: f64) -> Self {
    self.status_list_timeout_sec = sec;
    self
  }

  /// Resize the depth of the subscribed (`goal`, `cancel`) and published
  /// (`status`, `feedback`, `result`) topics from an [`ActionServerOptions`].
  /// `status` keeps depth 1 regardless, since only the latest status array
  /// matters.
  pub fn with_queue_sizes(mut self, opts: &ActionServerOptions) -> Self {
    self.goal = reliable_transient_local_qos(opts.sub_queue_size as i32);
    self.cancel = reliable_transient_local_qos(opts.sub_queue_size as i32);
    self.feedback = best_effort_qos(opts.pub_queue_size as i32);
    self.result = reliable_transient_local_qos(opts.pub_queue_size as i32);
    self
  }
}

/// Builder for [`crate::action::ActionClient`] construction-time options
/// not already covered by [`ActionClientQosPolicies`].
#[must_use]
#[derive(Clone)]
pub struct ActionClientOptions {
  pub pub_queue_size: usize,
  pub sub_queue_size: usize,
}

impl ActionClientOptions {
  pub fn new() -> Self {
    ActionClientOptions {
      pub_queue_size: DEFAULT_QUEUE_SIZE,
      sub_queue_size: DEFAULT_QUEUE_SIZE,
    }
  }
}

impl Default for ActionClientOptions {
  fn default() -> Self {
    Self::new()
  }
}

/// Builder for [`crate::action::ActionServer`] construction-time options
/// not already covered by [`ActionServerQosPolicies`].
#[must_use]
#[derive(Clone)]
pub struct ActionServerOptions {
  pub pub_queue_size: usize,
  pub sub_queue_size: usize,
}

impl ActionServerOptions {
  pub fn new() -> Self {
    ActionServerOptions {
      pub_queue_size: DEFAULT_QUEUE_SIZE,
      sub_queue_size: DEFAULT_QUEUE_SIZE,
    }
  }
}

impl Default for ActionServerOptions {
  fn default() -> Self {
    Self::new()
  }
}
