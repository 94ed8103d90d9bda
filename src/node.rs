#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{de::DeserializeOwned, Serialize};
use rustdds::{
  dds::{CreateError, CreateResult},
  *,
};

use crate::{
  action::{
    Action, ActionClient, ActionClientQosPolicies, ActionServer, ActionServerQosPolicies, ActionTypes,
    SimpleActionClient, SimpleActionServer,
  },
  context::Context,
  pubsub::{Publisher, Subscription},
};

/// Configuration of [Node].
///
/// This is a builder-like struct.
#[must_use]
pub struct NodeOptions {
  #[allow(dead_code)]
  cli_args: Vec<String>,
  #[allow(dead_code)]
  use_global_arguments: bool, // process-wide command line args
}

impl NodeOptions {
  /// Get a default NodeOptions.
  pub fn new() -> NodeOptions {
    NodeOptions {
      cli_args: Vec::new(),
      use_global_arguments: true,
    }
  }
}

impl Default for NodeOptions {
  fn default() -> Self {
    Self::new()
  }
}

/// A named endpoint in the pub/sub network. Produced by a [`Context`], and
/// in turn hands out the publishers/subscriptions and action client/server
/// façades built on top of them.
pub struct Node {
  name: String,
  namespace: String,
  options: NodeOptions,

  pub(crate) ros_context: Context,
}

impl Node {
  pub(crate) fn new(
    name: &str,
    namespace: &str,
    options: NodeOptions,
    ros_context: Context,
  ) -> CreateResult<Node> {
    Ok(Node {
      name: String::from(name),
      namespace: String::from(namespace),
      options,
      ros_context,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn fully_qualified_name(&self) -> String {
    let mut nn = self.namespace.clone();
    nn.push('/');
    nn.push_str(&self.name);
    nn
  }

  pub fn options(&self) -> &NodeOptions {
    &self.options
  }

  pub fn domain_id(&self) -> u16 {
    self.ros_context.domain_id()
  }

  /// Creates a topic and handles necessary conversions from DDS.
  ///
  /// # Arguments
  ///
  /// * `name` - Name of the topic
  /// * `type_name` - What type the topic holds in string form
  /// * `qos` - Quality of Service parameters for the topic
  pub fn create_topic(&self, name: &str, type_name: String, qos: &QosPolicies) -> CreateResult<Topic> {
    let oname = Self::check_name_and_add_prefix("rt/".to_owned(), name)?;
    info!("Creating topic, DDS name: {}", oname);
    let topic = self
      .ros_context
      .domain_participant()
      .create_topic(oname, type_name, qos, TopicKind::NoKey)?;
    info!("Created topic");
    Ok(topic)
  }

  /// Creates a Subscription to a no-key topic.
  pub fn create_subscription<D: DeserializeOwned + 'static>(
    &self,
    topic: &Topic,
    qos: Option<QosPolicies>,
  ) -> CreateResult<Subscription<D>> {
    self.ros_context.create_subscription(topic, qos)
  }

  fn check_name_and_add_prefix(mut prefix: String, name: &str) -> CreateResult<String> {
    if name.is_empty() {
      return create_error_bad_parameter!("Topic name must not be empty.");
    }
    // avoid double slash in name
    prefix.push_str(name.strip_prefix('/').unwrap_or(name));
    Ok(prefix)
  }

  /// Creates a Publisher to a no-key topic.
  pub fn create_publisher<D: Serialize>(
    &self,
    topic: &Topic,
    qos: Option<QosPolicies>,
  ) -> CreateResult<Publisher<D>> {
    self.ros_context.create_publisher(topic, qos)
  }

  pub(crate) fn create_simpledatareader<D, DA>(
    &self,
    topic: &Topic,
    qos: Option<QosPolicies>,
  ) -> CreateResult<no_key::SimpleDataReader<D, DA>>
  where
    D: 'static,
    DA: rustdds::no_key::DeserializerAdapter<D> + 'static,
  {
    self.ros_context.create_simpledatareader(topic, qos)
  }

  pub(crate) fn create_datawriter<D, SA>(
    &self,
    topic: &Topic,
    qos: Option<QosPolicies>,
  ) -> CreateResult<no_key::DataWriter<D, SA>>
  where
    SA: rustdds::no_key::SerializerAdapter<D>,
  {
    self.ros_context.create_datawriter(topic, qos)
  }

  /// Builds the five plain topics (`goal`, `cancel`, `status`, `feedback`,
  /// `result`) under `action_name` and wires up an [`ActionClient`].
  pub fn create_action_client<A>(
    &self,
    action_name: &str,
    action_qos: ActionClientQosPolicies,
  ) -> CreateResult<ActionClient<A>>
  where
    A: ActionTypes + 'static,
  {
    let goal_topic = self.create_topic(
      &(action_name.to_owned() + "/goal"),
      Action::<A>::goal_type_name(),
      &action_qos.goal,
    )?;
    let goal_pub = self.create_publisher(&goal_topic, Some(action_qos.goal))?;

    let cancel_topic = self.create_topic(
      &(action_name.to_owned() + "/cancel"),
      Action::<A>::goal_id_type_name(),
      &action_qos.cancel,
    )?;
    let cancel_pub = self.create_publisher(&cancel_topic, Some(action_qos.cancel))?;

    let status_topic = self.create_topic(
      &(action_name.to_owned() + "/status"),
      Action::<A>::status_type_name(),
      &action_qos.status,
    )?;
    let status_sub = self.create_subscription(&status_topic, Some(action_qos.status))?;

    let feedback_topic = self.create_topic(
      &(action_name.to_owned() + "/feedback"),
      Action::<A>::feedback_type_name(),
      &action_qos.feedback,
    )?;
    let feedback_sub = self.create_subscription(&feedback_topic, Some(action_qos.feedback))?;

    let result_topic = self.create_topic(
      &(action_name.to_owned() + "/result"),
      Action::<A>::result_type_name(),
      &action_qos.result,
    )?;
    let result_sub = self.create_subscription(&result_topic, Some(action_qos.result))?;

    Ok(ActionClient::new(
      action_name.to_owned(),
      self.name.clone(),
      goal_pub,
      cancel_pub,
      status_sub,
      feedback_sub,
      result_sub,
    ))
  }

  /// Builds the five plain topics under `action_name` and wires up an
  /// [`ActionServer`].
  pub fn create_action_server<A>(
    &self,
    action_name: &str,
    action_qos: ActionServerQosPolicies,
  ) -> CreateResult<ActionServer<A>>
  where
    A: ActionTypes + 'static,
    A::Result: Default,
  {
    let goal_topic = self.create_topic(
      &(action_name.to_owned() + "/goal"),
      Action::<A>::goal_type_name(),
      &action_qos.goal,
    )?;
    let goal_sub = self.create_subscription(&goal_topic, Some(action_qos.goal))?;

    let cancel_topic = self.create_topic(
      &(action_name.to_owned() + "/cancel"),
      Action::<A>::goal_id_type_name(),
      &action_qos.cancel,
    )?;
    let cancel_sub = self.create_subscription(&cancel_topic, Some(action_qos.cancel))?;

    let status_topic = self.create_topic(
      &(action_name.to_owned() + "/status"),
      Action::<A>::status_type_name(),
      &action_qos.status,
    )?;
    let status_pub = self.create_publisher(&status_topic, Some(action_qos.status))?;

    let feedback_topic = self.create_topic(
      &(action_name.to_owned() + "/feedback"),
      Action::<A>::feedback_type_name(),
      &action_qos.feedback,
    )?;
    let feedback_pub = self.create_publisher(&feedback_topic, Some(action_qos.feedback))?;

    let result_topic = self.create_topic(
      &(action_name.to_owned() + "/result"),
      Action::<A>::result_type_name(),
      &action_qos.result,
    )?;
    let result_pub = self.create_publisher(&result_topic, Some(action_qos.result))?;

    Ok(ActionServer::new(
      action_name.to_owned(),
      self.name.clone(),
      goal_sub,
      cancel_sub,
      status_pub,
      feedback_pub,
      result_pub,
      action_qos.status_frequency_hz,
      action_qos.status_list_timeout_sec,
    ))
  }

  /// Convenience wrapper: an [`ActionClient`] that only ever tracks the
  /// most recently sent goal.
  pub fn create_simple_action_client<A>(
    &self,
    action_name: &str,
    action_qos: ActionClientQosPolicies,
  ) -> CreateResult<SimpleActionClient<A>>
  where
    A: ActionTypes + 'static,
  {
    Ok(SimpleActionClient::new(
      self.create_action_client(action_name, action_qos)?,
    ))
  }

  /// Convenience wrapper: an [`ActionServer`] restricted to a single
  /// current/next goal slot (spec §4.8).
  pub fn create_simple_action_server<A>(
    &self,
    action_name: &str,
    action_qos: ActionServerQosPolicies,
  ) -> CreateResult<SimpleActionServer<A>>
  where
    A: ActionTypes + 'static,
    A::Result: Default,
  {
    let goal_topic = self.create_topic(
      &(action_name.to_owned() + "/goal"),
      Action::<A>::goal_type_name(),
      &action_qos.goal,
    )?;
    let goal_sub = self.create_subscription(&goal_topic, Some(action_qos.goal))?;

    let cancel_topic = self.create_topic(
      &(action_name.to_owned() + "/cancel"),
      Action::<A>::goal_id_type_name(),
      &action_qos.cancel,
    )?;
    let cancel_sub = self.create_subscription(&cancel_topic, Some(action_qos.cancel))?;

    let status_topic = self.create_topic(
      &(action_name.to_owned() + "/status"),
      Action::<A>::status_type_name(),
      &action_qos.status,
    )?;
    let status_pub = self.create_publisher(&status_topic, Some(action_qos.status))?;

    let feedback_topic = self.create_topic(
      &(action_name.to_owned() + "/feedback"),
      Action::<A>::feedback_type_name(),
      &action_qos.feedback,
    )?;
    let feedback_pub = self.create_publisher(&feedback_topic, Some(action_qos.feedback))?;

    let result_topic = self.create_topic(
      &(action_name.to_owned() + "/result"),
      Action::<A>::result_type_name(),
      &action_qos.result,
    )?;
    let result_pub = self.create_publisher(&result_topic, Some(action_qos.result))?;

    Ok(SimpleActionServer::new(
      action_name.to_owned(),
      self.name.clone(),
      goal_sub,
      cancel_sub,
      status_pub,
      feedback_pub,
      result_pub,
      action_qos.status_frequency_hz,
      action_qos.status_list_timeout_sec,
    ))
  }
} // impl Node
