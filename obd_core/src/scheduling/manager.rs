use crate::communication::MessengerHandle;
use crate::core::{Address, Node, NodeState, RegisteredNode, DEFAULT_NODE_BUDGET};
use crate::error::ObdResult;

/// Registry of live nodes.
///
/// Nodes are kept in insertion order, which is also the order of `init` and
/// `update` dispatch. At most one node per address and per concrete type is
/// admitted.
#[derive(Debug)]
pub struct Manager {
    nodes: Vec<RegisteredNode>,
    messenger: Option<MessengerHandle>,
    node_budget: usize,
    initialized: bool,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Registry without a messenger; its nodes can never initialize
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            messenger: None,
            node_budget: DEFAULT_NODE_BUDGET,
            initialized: false,
        }
    }

    /// Registry whose nodes emit through `messenger`
    pub fn with_messenger(messenger: MessengerHandle) -> Self {
        Self {
            messenger: Some(messenger),
            ..Self::new()
        }
    }

    /// Default per-tick treatment budget for nodes added afterwards
    pub fn with_node_budget(mut self, budget: usize) -> Self {
        self.node_budget = budget;
        self
    }

    /// Register a node. Refused (false) when its address is broadcast or
    /// already taken, or when a node of the same concrete type is registered.
    pub fn add_node(&mut self, node: Box<dyn Node>) -> bool {
        let address = node.address();
        if address.is_broadcast() {
            log::warn!(
                "Refusing node '{}': the broadcast address cannot be owned",
                node.name()
            );
            return false;
        }
        if let Some(existing) = self.get_node(address) {
            log::debug!(
                "Refusing node '{}': {} already owned by '{}'",
                node.name(),
                address,
                existing.name()
            );
            return false;
        }
        let kind = node.as_any().type_id();
        if let Some(existing) = self
            .nodes
            .iter()
            .find(|existing| existing.node().as_any().type_id() == kind)
        {
            log::debug!(
                "Refusing node '{}': same type as '{}' at {}",
                node.name(),
                existing.name(),
                existing.address()
            );
            return false;
        }
        if let Some(messenger) = &self.messenger {
            messenger.register_name(address, node.name());
        }
        log::debug!("Added node '{}' at {}", node.name(), address);
        let registered =
            RegisteredNode::new(node, self.messenger.clone()).with_default_budget(self.node_budget);
        self.nodes.push(registered);
        true
    }

    pub fn get_node(&self, address: Address) -> Option<&RegisteredNode> {
        self.nodes.iter().find(|node| node.address() == address)
    }

    pub fn get_node_mut(&mut self, address: Address) -> Option<&mut RegisteredNode> {
        self.nodes.iter_mut().find(|node| node.address() == address)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&RegisteredNode> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Typed lookup of the first node whose concrete type is `T`
    pub fn get_driver<T: Node>(&self) -> Option<&T> {
        self.nodes
            .iter()
            .find_map(|node| node.node().as_any().downcast_ref::<T>())
    }

    pub fn get_driver_mut<T: Node>(&mut self) -> Option<&mut T> {
        self.nodes
            .iter_mut()
            .find_map(|node| node.node_mut().as_any_mut().downcast_mut::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredNode> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredNode> {
        self.nodes.iter_mut()
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the registry initialized and initialize every node still
    /// uninitialized, in order. A node failing to initialize does not block
    /// the others; terminated nodes are never brought back.
    pub fn init(&mut self) {
        self.initialized = true;
        for node in self
            .nodes
            .iter_mut()
            .filter(|node| node.info().state() == NodeState::Uninitialized)
        {
            if !node.init() {
                log::warn!("Node '{}' stays uninitialized", node.name());
            }
        }
    }

    /// Update every node in registration order
    pub fn update(&mut self) {
        if !self.initialized {
            return;
        }
        for node in self.nodes.iter_mut() {
            node.update();
        }
    }

    /// Terminate every initialized node in registration order
    pub fn terminate(&mut self) {
        for node in self.nodes.iter_mut().filter(|node| node.initialized()) {
            node.terminate();
        }
        self.initialized = false;
    }

    /// Offer `dependency` to the `link_node` hook of `dependent`.
    /// False when either is missing or both are the same node.
    pub fn link_nodes(&mut self, dependent: Address, dependency: Address) -> bool {
        let position = |address: Address| self.nodes.iter().position(|n| n.address() == address);
        let (Some(i), Some(j)) = (position(dependent), position(dependency)) else {
            return false;
        };
        if i == j {
            return false;
        }
        let (node, other) = if i < j {
            let (head, tail) = self.nodes.split_at_mut(j);
            (&mut head[i], &tail[0])
        } else {
            let (head, tail) = self.nodes.split_at_mut(i);
            (&mut tail[0], &head[j])
        };
        node.link(other)
    }

    /// Run every node's `load_config` hook, stopping at the first failure
    pub fn load_all_config(&mut self) -> ObdResult<()> {
        for node in self.nodes.iter_mut() {
            node.load_config()?;
        }
        Ok(())
    }

    /// Run every node's `save_config` hook, stopping at the first failure
    pub fn save_all_config(&self) -> ObdResult<()> {
        for node in self.nodes.iter() {
            node.save_config()?;
        }
        Ok(())
    }
}
