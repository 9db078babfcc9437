use super::address::Address;
use super::message::{Message, MessageType};
use crate::communication::MessengerHandle;
use crate::error::ObdResult;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

/// Successful treatments a node performs per tick unless configured otherwise
pub const DEFAULT_NODE_BUDGET: usize = 3;

/// Command every node understands; answered with a Reply carrying [`Node::info`]
pub const INFO_COMMAND: &str = "info";

/// Node lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Uninitialized,
    Initialized,
    Terminated,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Uninitialized => write!(f, "Uninitialized"),
            NodeState::Initialized => write!(f, "Initialized"),
            NodeState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Broad family a driver belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    None,
    Hardware,
    Console,
    Communicator,
}

/// Message counters of a single node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeMetrics {
    pub messages_accepted: u64,
    pub messages_rejected: u64,
    pub messages_treated: u64,
    pub messages_discarded: u64,
    pub messages_sent: u64,
    pub updates: u64,
}

/// Kernel-owned context of a registered node.
///
/// Holds the inbox and lifecycle state, and gives node hooks the only
/// outbound channel they have: the attached messenger.
pub struct NodeInfo {
    name: String,
    address: Address,
    state: NodeState,
    inbox: VecDeque<Message>,
    budget: usize,
    messenger: Option<MessengerHandle>,
    metrics: NodeMetrics,
}

impl NodeInfo {
    pub fn new(
        name: impl Into<String>,
        address: Address,
        messenger: Option<MessengerHandle>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            state: NodeState::Uninitialized,
            inbox: VecDeque::new(),
            budget: DEFAULT_NODE_BUDGET,
            messenger,
            metrics: NodeMetrics::default(),
        }
    }

    // Getters
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn address(&self) -> Address {
        self.address
    }
    pub fn state(&self) -> NodeState {
        self.state
    }
    pub fn initialized(&self) -> bool {
        self.state == NodeState::Initialized
    }
    pub fn queue_size(&self) -> usize {
        self.inbox.len()
    }
    pub fn budget(&self) -> usize {
        self.budget
    }
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }
    pub fn has_messenger(&self) -> bool {
        self.messenger.is_some()
    }
    pub fn messenger(&self) -> Option<&MessengerHandle> {
        self.messenger.as_ref()
    }

    /// Pending inbox entries, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.inbox.iter()
    }

    /// Set the per-tick treatment budget; zero is raised to one
    pub fn set_budget(&mut self, budget: usize) {
        if budget == 0 {
            log::warn!("Node '{}' budget of 0 raised to 1", self.name);
        }
        self.budget = budget.max(1);
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    // Outbound primitives

    /// Hand a message to the messenger; routed at the next tick at the earliest
    pub fn broadcast_message(&mut self, message: Message) {
        match &self.messenger {
            Some(messenger) => {
                messenger.push_message(message);
                self.metrics.messages_sent += 1;
            }
            None => log::debug!(
                "Node '{}' has no messenger, dropping outbound {}",
                self.name,
                message
            ),
        }
    }

    /// Build a message from this node and broadcast it
    pub fn broadcast_to(
        &mut self,
        destination: Address,
        text: impl Into<String>,
        message_type: MessageType,
    ) {
        let message = Message::with_payload(self.address, destination, text, message_type);
        self.broadcast_message(message);
    }

    /// Send text to the configured diagnostic sink
    pub fn console(&mut self, text: impl Into<String>, message_type: MessageType) {
        let text = text.into();
        match self.messenger.as_ref().and_then(|m| m.diagnostic_sink()) {
            Some(sink) => self.broadcast_to(sink, text, message_type),
            None => log::debug!("[{}] {}: {}", self.name, message_type, text),
        }
    }

    // Directory lookups through the messenger

    pub fn compute_name(&self, address: Address) -> String {
        match &self.messenger {
            Some(messenger) => messenger.compute_name(address),
            None => crate::communication::UNKNOWN_NAME.to_string(),
        }
    }

    pub fn compute_id(&self, name: &str) -> Address {
        self.messenger
            .as_ref()
            .map(|m| m.compute_id(name))
            .unwrap_or(Address::BROADCAST)
    }

    pub fn driver_list(&self) -> Vec<String> {
        self.messenger
            .as_ref()
            .map(|m| m.driver_list())
            .unwrap_or_default()
    }
}

impl fmt::Debug for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInfo")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("state", &self.state)
            .field("queue_size", &self.inbox.len())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Trait implemented by every driver of the controller.
///
/// The kernel owns the lifecycle and the inbox; implementations only provide
/// capabilities. Command handling runs as a fixed chain: the kernel's own
/// capability (the `info` command) is evaluated first, then the node's
/// [`accepts_command`](Node::accepts_command) /
/// [`treat_message`](Node::treat_message).
///
/// Hooks must stay bounded: no blocking I/O inside a tick.
pub trait Node: Any + Send {
    /// Display name, unique across the registry
    fn name(&self) -> &'static str;

    /// Bus address assigned by the assembler
    fn address(&self) -> Address;

    fn category(&self) -> Category {
        Category::None
    }

    /// Human-readable description returned to `info` commands
    fn info(&self) -> String {
        String::new()
    }

    /// Node specific initialization; an error leaves the node uninitialized
    fn init(&mut self, _ctx: &mut NodeInfo) -> ObdResult<()> {
        Ok(())
    }

    /// Called every tick before the inbox is drained
    fn pre_treatment(&mut self, _ctx: &mut NodeInfo) {}

    /// Treat one inbox entry the kernel did not handle itself.
    /// Returns true when the message counted against the tick budget.
    fn treat_message(&mut self, _ctx: &mut NodeInfo, _message: &Message) -> bool {
        false
    }

    /// Called every tick after the inbox is drained
    fn post_treatment(&mut self, _ctx: &mut NodeInfo) {}

    /// Command whitelist extension, consulted after the built-in `info`
    fn accepts_command(&self, _message: &Message) -> bool {
        false
    }

    /// Accept a direct reference to a dependency outside the message protocol
    fn link_node(&mut self, _other: &dyn Node) -> bool {
        false
    }

    fn terminate(&mut self, _ctx: &mut NodeInfo) {}

    /// Override of the configured per-tick treatment budget
    fn frame_budget(&self) -> Option<usize> {
        None
    }

    fn load_config(&mut self, _ctx: &mut NodeInfo) -> ObdResult<()> {
        Ok(())
    }

    fn save_config(&self, _ctx: &NodeInfo) -> ObdResult<()> {
        Ok(())
    }

    /// Downcast support, required for typed lookups
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A node paired with its kernel context.
///
/// Implements the sealed part of the node contract: admission, the budgeted
/// per-tick drain and the lifecycle transitions.
pub struct RegisteredNode {
    node: Box<dyn Node>,
    info: NodeInfo,
}

impl RegisteredNode {
    pub fn new(node: Box<dyn Node>, messenger: Option<MessengerHandle>) -> Self {
        let mut info = NodeInfo::new(node.name(), node.address(), messenger);
        if let Some(budget) = node.frame_budget() {
            info.set_budget(budget);
        }
        Self { node, info }
    }

    /// Apply a registry-wide budget unless the node overrides it
    pub fn with_default_budget(mut self, budget: usize) -> Self {
        if self.node.frame_budget().is_none() {
            self.info.set_budget(budget);
        }
        self
    }

    pub fn node(&self) -> &dyn Node {
        self.node.as_ref()
    }
    pub fn node_mut(&mut self) -> &mut dyn Node {
        self.node.as_mut()
    }
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }
    pub fn name(&self) -> &str {
        self.info.name()
    }
    pub fn address(&self) -> Address {
        self.info.address()
    }
    pub fn initialized(&self) -> bool {
        self.info.initialized()
    }
    pub fn queue_size(&self) -> usize {
        self.info.queue_size()
    }

    /// Initialize the node once; fails without an attached messenger or when
    /// the node already left the `Uninitialized` state
    pub fn init(&mut self) -> bool {
        if self.info.state() != NodeState::Uninitialized {
            log::debug!(
                "Node '{}' is {}, not initializing again",
                self.info.name(),
                self.info.state()
            );
            return false;
        }
        if !self.info.has_messenger() {
            log::warn!(
                "Node '{}' has no messenger attached, staying uninitialized",
                self.info.name()
            );
            return false;
        }
        match self.node.init(&mut self.info) {
            Ok(()) => {
                self.info.set_state(NodeState::Initialized);
                log::debug!("Initialized node '{}' at {}", self.info.name(), self.address());
                true
            }
            Err(e) => {
                log::error!("Failed to initialize node '{}': {}", self.info.name(), e);
                false
            }
        }
    }

    pub fn terminate(&mut self) {
        self.node.terminate(&mut self.info);
        self.info.set_state(NodeState::Terminated);
        log::debug!("Terminated node '{}'", self.info.name());
    }

    /// Inbox admission, called by the messenger while routing.
    ///
    /// Conversational messages are always accepted. Commands must be
    /// addressed to this node (or broadcast) and whitelisted; a rejected
    /// command raises a warning on the diagnostic sink and is discarded.
    pub fn push_message(&mut self, message: &Message) -> bool {
        if !self.info.initialized() {
            return false;
        }
        if message.message_type() != MessageType::Command {
            self.enqueue(message);
            return true;
        }
        if !message.is_for_me(self.address()) {
            self.reject(message, "Bad Destination");
            return false;
        }
        if self.accepts_command(message) {
            self.enqueue(message);
            return true;
        }
        self.reject(message, "Unknown Command");
        false
    }

    /// Drain the inbox until it is empty or the budget of successful
    /// treatments is spent. Every popped entry is consumed, treated or not.
    pub fn update(&mut self) {
        if !self.info.initialized() {
            return;
        }
        self.info.metrics.updates += 1;
        self.node.pre_treatment(&mut self.info);
        let mut treated = 0;
        while let Some(message) = self.info.inbox.pop_front() {
            if self.treat(&message) {
                treated += 1;
                self.info.metrics.messages_treated += 1;
            } else {
                self.info.metrics.messages_discarded += 1;
            }
            if treated >= self.info.budget {
                break;
            }
        }
        self.node.post_treatment(&mut self.info);
    }

    /// Offer `dependency` to this node's `link_node` hook
    pub fn link(&mut self, dependency: &RegisteredNode) -> bool {
        self.node.link_node(dependency.node())
    }

    pub fn load_config(&mut self) -> ObdResult<()> {
        self.node.load_config(&mut self.info)
    }

    pub fn save_config(&self) -> ObdResult<()> {
        self.node.save_config(&self.info)
    }

    fn accepts_command(&self, message: &Message) -> bool {
        message.base_command() == INFO_COMMAND || self.node.accepts_command(message)
    }

    fn treat(&mut self, message: &Message) -> bool {
        if message.message_type() == MessageType::Command
            && message.base_command() == INFO_COMMAND
        {
            let info = self.node.info();
            self.info.broadcast_to(message.source(), info, MessageType::Reply);
            return true;
        }
        self.node.treat_message(&mut self.info, message)
    }

    fn enqueue(&mut self, message: &Message) {
        self.info.inbox.push_back(message.clone());
        self.info.metrics.messages_accepted += 1;
    }

    fn reject(&mut self, message: &Message, reason: &str) {
        self.info.metrics.messages_rejected += 1;
        log::debug!(
            "Node '{}' rejected {}: {}",
            self.info.name(),
            message,
            reason
        );
        self.info.console(reason, MessageType::Warning);
    }
}

impl fmt::Debug for RegisteredNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredNode")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::Messenger;

    struct Plain;

    impl Node for Plain {
        fn name(&self) -> &'static str {
            "Plain"
        }
        fn address(&self) -> Address {
            Address::new(3)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Accepts `ping` and answers with `pong`
    struct Pinger {
        pre: usize,
        post: usize,
    }

    impl Node for Pinger {
        fn name(&self) -> &'static str {
            "Pinger"
        }
        fn address(&self) -> Address {
            Address::new(4)
        }
        fn info(&self) -> String {
            "pinger node".to_string()
        }
        fn pre_treatment(&mut self, _ctx: &mut NodeInfo) {
            self.pre += 1;
        }
        fn post_treatment(&mut self, _ctx: &mut NodeInfo) {
            self.post += 1;
        }
        fn accepts_command(&self, message: &Message) -> bool {
            message.base_command() == "ping"
        }
        fn treat_message(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
            if message.base_command() == "ping" {
                ctx.broadcast_to(message.source(), "pong", MessageType::Reply);
                return true;
            }
            false
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn command(destination: Address, line: &str) -> Message {
        Message::command(Address::BROADCAST, destination, line)
    }

    #[test]
    fn test_creation_without_messenger() {
        let mut node = RegisteredNode::new(Box::new(Plain), None);
        assert_eq!(node.name(), "Plain");
        assert!(!node.initialized());
        assert!(!node.push_message(&Message::new(Address::BROADCAST, Address::new(1))));
        node.update();
        assert_eq!(node.node().info(), "");
        assert!(node.save_config().is_ok());
        assert!(node.load_config().is_ok());

        assert!(!node.init());
        assert!(!node.initialized());
        assert_eq!(node.info().state(), NodeState::Uninitialized);
    }

    #[test]
    fn test_initialization() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        assert!(node.init());
        node.update();
        assert!(node.initialized());
        node.terminate();
        assert!(!node.initialized());
        assert_eq!(node.info().state(), NodeState::Terminated);
        assert_eq!(node.node().category(), Category::None);
    }

    #[test]
    fn test_admission() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        node.init();
        let me = node.address();

        // conversational messages are always accepted
        assert!(node.push_message(&Message::new(Address::BROADCAST, Address::new(1))));
        // bad destination
        assert!(!node.push_message(&command(Address::new(1), "bob")));
        // unknown command
        assert!(!node.push_message(&command(me, "bob")));
        // known command
        assert!(node.push_message(&command(me, "info")));
        // known command sent to all
        assert!(node.push_message(&command(Address::BROADCAST, "info")));
        // known command, foreign destination
        assert!(!node.push_message(&command(Address::new(185), "info")));

        assert_eq!(node.queue_size(), 3);
        assert_eq!(node.info().metrics().messages_rejected, 3);
    }

    #[test]
    fn test_rejection_warns_diagnostic_sink() {
        let messenger = Messenger::new().with_diagnostic_sink(Address::new(9));
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        node.init();

        assert!(!node.push_message(&command(node.address(), "format")));
        assert_eq!(messenger.size(), 1);
        let warning = messenger.handle().pop_front().unwrap();
        assert_eq!(warning.message_type(), MessageType::Warning);
        assert_eq!(warning.destination(), Address::new(9));
        assert_eq!(warning.source(), node.address());
        assert_eq!(warning.payload(), "Unknown Command");
    }

    #[test]
    fn test_treat_messages_budget() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        node.init();
        let me = node.address();

        let pushes = [
            (command(me, "info"), true),
            (Message::with_payload(Address::BROADCAST, me, "hello!", MessageType::Message), true),
            (Message::with_payload(Address::BROADCAST, me, "info", MessageType::Reply), true),
            (command(me, "info"), true),
            (Message::with_payload(Address::BROADCAST, me, "info", MessageType::Message), true),
            (command(me, "info"), true),
            (command(me, "info"), true),
            (command(me, "boby"), false),
        ];
        for (message, accepted) in &pushes {
            assert_eq!(node.push_message(message), *accepted);
        }
        assert_eq!(node.queue_size(), 7);

        // 3 successful infos end the first drain; the trailing info remains
        node.update();
        assert_eq!(node.queue_size(), 1);
        let replies: Vec<Message> =
            std::iter::from_fn(|| messenger.handle().pop_front()).collect();
        assert_eq!(replies.len(), 3);
        for reply in &replies {
            assert_eq!(reply.message_type(), MessageType::Reply);
            assert_eq!(reply.source(), me);
            assert_eq!(reply.destination(), Address::BROADCAST);
        }
        node.update();
        assert_eq!(node.queue_size(), 0);
        assert_eq!(messenger.size(), 1);
        assert_eq!(node.info().metrics().messages_treated, 4);
        assert_eq!(node.info().metrics().messages_discarded, 3);
    }

    #[test]
    fn test_info_reply_goes_back_to_source() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(
            Box::new(Pinger { pre: 0, post: 0 }),
            Some(messenger.handle()),
        );
        node.init();
        let asker = Address::new(12);
        assert!(node.push_message(&Message::command(asker, node.address(), "info")));
        node.update();

        let reply = messenger.handle().pop_front().unwrap();
        assert_eq!(reply.message_type(), MessageType::Reply);
        assert_eq!(reply.source(), node.address());
        assert_eq!(reply.destination(), asker);
        assert_eq!(reply.payload(), "pinger node");
    }

    #[test]
    fn test_handler_chain() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(
            Box::new(Pinger { pre: 0, post: 0 }),
            Some(messenger.handle()),
        );
        node.init();
        let me = node.address();

        assert!(node.push_message(&command(me, "ping")));
        assert!(node.push_message(&command(me, "info")));
        assert!(!node.push_message(&command(me, "pong")));
        node.update();

        let payloads: Vec<String> = std::iter::from_fn(|| messenger.handle().pop_front())
            .map(|m| m.payload().to_string())
            .collect();
        assert_eq!(payloads, vec!["pong", "pinger node"]);

        let pinger = node.node().as_any().downcast_ref::<Pinger>().unwrap();
        assert_eq!((pinger.pre, pinger.post), (1, 1));
    }

    #[test]
    fn test_frame_budget_override() {
        struct Greedy;
        impl Node for Greedy {
            fn name(&self) -> &'static str {
                "Greedy"
            }
            fn address(&self) -> Address {
                Address::new(5)
            }
            fn frame_budget(&self) -> Option<usize> {
                Some(5)
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let greedy = RegisteredNode::new(Box::new(Greedy), None).with_default_budget(2);
        assert_eq!(greedy.info().budget(), 5);
        let plain = RegisteredNode::new(Box::new(Plain), None).with_default_budget(2);
        assert_eq!(plain.info().budget(), 2);
    }

    #[test]
    fn test_zero_budget_raised_to_one() {
        let messenger = Messenger::new();
        let mut node =
            RegisteredNode::new(Box::new(Plain), Some(messenger.handle())).with_default_budget(0);
        assert_eq!(node.info().budget(), 1);
        node.init();
        let me = node.address();
        for _ in 0..2 {
            assert!(node.push_message(&command(me, "info")));
        }
        node.update();
        assert_eq!(node.queue_size(), 1);
        assert_eq!(messenger.size(), 1);
    }

    #[test]
    fn test_init_happens_once() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        assert!(node.init());
        assert!(!node.init());
        assert_eq!(node.info().state(), NodeState::Initialized);

        node.terminate();
        assert!(!node.init());
        assert_eq!(node.info().state(), NodeState::Terminated);
        assert!(!node.push_message(&command(node.address(), "info")));
    }

    #[test]
    fn test_terminated_node_is_inert() {
        let messenger = Messenger::new();
        let mut node = RegisteredNode::new(Box::new(Plain), Some(messenger.handle()));
        node.init();
        node.terminate();
        assert!(!node.push_message(&command(node.address(), "info")));
        node.update();
        assert_eq!(node.info().metrics().updates, 0);
    }
}
