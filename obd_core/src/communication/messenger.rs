use crate::core::{Address, Message};
use crate::scheduling::Manager;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Successful routes performed per tick unless configured otherwise
pub const DEFAULT_MESSENGER_BUDGET: usize = 10;

/// Display name of the broadcast address
pub const ALL_NAME: &str = "All";

/// Display name of an address no live node claims
pub const UNKNOWN_NAME: &str = "Unknown";

/// Routing counters, monotonic over the messenger's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Messages pushed into the outbound queue
    pub received: u64,
    /// Messages accepted by at least one node
    pub sent: u64,
    /// Messages no node accepted
    pub dropped: u64,
}

/// State shared between the messenger and every node holding a handle
#[derive(Default)]
struct Outbound {
    queue: VecDeque<Message>,
    statistics: Statistics,
    directory: Vec<(Address, String)>,
    diagnostic_sink: Option<Address>,
}

/// Cloneable access to the messenger's outbound side.
///
/// This is the back-reference every node context holds: pushing traffic,
/// the name directory and the diagnostic sink address.
#[derive(Clone, Default)]
pub struct MessengerHandle {
    shared: Arc<Mutex<Outbound>>,
}

impl MessengerHandle {
    /// Append to the outbound FIFO; never rejects
    pub fn push_message(&self, message: Message) {
        let mut outbound = self.shared.lock();
        outbound.queue.push_back(message);
        outbound.statistics.received += 1;
    }

    pub fn len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().queue.is_empty()
    }

    pub fn stats(&self) -> Statistics {
        self.shared.lock().statistics
    }

    pub fn diagnostic_sink(&self) -> Option<Address> {
        self.shared.lock().diagnostic_sink
    }

    pub fn compute_name(&self, address: Address) -> String {
        if address.is_broadcast() {
            return ALL_NAME.to_string();
        }
        self.shared
            .lock()
            .directory
            .iter()
            .find(|(known, _)| *known == address)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    pub fn compute_id(&self, name: &str) -> Address {
        if name == ALL_NAME {
            return Address::BROADCAST;
        }
        self.shared
            .lock()
            .directory
            .iter()
            .find(|(_, known)| known == name)
            .map(|(address, _)| *address)
            .unwrap_or(Address::BROADCAST)
    }

    /// Registered driver names, in registration order
    pub fn driver_list(&self) -> Vec<String> {
        self.shared
            .lock()
            .directory
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub(crate) fn register_name(&self, address: Address, name: &str) {
        let mut outbound = self.shared.lock();
        if !outbound.directory.iter().any(|(known, _)| *known == address) {
            outbound.directory.push((address, name.to_string()));
        }
    }

    pub(crate) fn set_diagnostic_sink(&self, sink: Option<Address>) {
        self.shared.lock().diagnostic_sink = sink;
    }

    /// Take the oldest queued message without routing it
    pub fn pop_front(&self) -> Option<Message> {
        self.shared.lock().queue.pop_front()
    }

    fn record_route(&self, accepted: bool) {
        let mut outbound = self.shared.lock();
        if accepted {
            outbound.statistics.sent += 1;
        } else {
            outbound.statistics.dropped += 1;
        }
    }
}

impl fmt::Debug for MessengerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outbound = self.shared.lock();
        f.debug_struct("MessengerHandle")
            .field("queued", &outbound.queue.len())
            .field("statistics", &outbound.statistics)
            .field("diagnostic_sink", &outbound.diagnostic_sink)
            .finish()
    }
}

/// Routing layer between nodes.
///
/// `update` pops messages from the front of the outbound FIFO and offers
/// each one to every node it is addressed to. Every popped message is
/// consumed; only successful routes count against the per-tick budget, so
/// unroutable traffic never eats into the throughput of live nodes.
#[derive(Debug)]
pub struct Messenger {
    handle: MessengerHandle,
    budget: usize,
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger {
    pub fn new() -> Self {
        Self {
            handle: MessengerHandle::default(),
            budget: DEFAULT_MESSENGER_BUDGET,
        }
    }

    /// Set the number of successful routes per tick, at least one (builder pattern)
    pub fn with_budget(mut self, budget: usize) -> Self {
        if budget == 0 {
            log::warn!("Messenger budget of 0 raised to 1");
        }
        self.budget = budget.max(1);
        self
    }

    /// Address that `NodeInfo::console` targets (builder pattern)
    pub fn with_diagnostic_sink(self, sink: Address) -> Self {
        self.handle.set_diagnostic_sink(Some(sink));
        self
    }

    pub fn set_diagnostic_sink(&self, sink: Option<Address>) {
        self.handle.set_diagnostic_sink(sink);
    }

    pub fn diagnostic_sink(&self) -> Option<Address> {
        self.handle.diagnostic_sink()
    }

    /// Handle for node contexts and for the manager's name directory
    pub fn handle(&self) -> MessengerHandle {
        self.handle.clone()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn push_message(&self, message: Message) {
        self.handle.push_message(message);
    }

    /// Messages waiting to be routed
    pub fn size(&self) -> usize {
        self.handle.len()
    }

    pub fn stats(&self) -> Statistics {
        self.handle.stats()
    }

    /// Route queued messages into node inboxes. Returns the successful routes.
    ///
    /// Messages queued while routing (admission warnings) join the tail of
    /// the FIFO and are routed in the same pass if budget remains.
    pub fn update(&mut self, manager: &mut Manager) -> usize {
        let mut routed = 0;
        while let Some(message) = self.handle.pop_front() {
            let accepted = self.send_message(&message, manager);
            self.handle.record_route(accepted);
            if accepted {
                routed += 1;
            } else {
                log::trace!("Dropped unroutable {}", message);
            }
            if routed >= self.budget {
                break;
            }
        }
        routed
    }

    /// Offer a message to every node it is addressed to.
    /// True when at least one node admitted it.
    fn send_message(&self, message: &Message, manager: &mut Manager) -> bool {
        let mut sent = false;
        for node in manager.iter_mut() {
            if message.is_for_me(node.address()) && node.push_message(message) {
                sent = true;
            }
        }
        sent
    }

    pub fn compute_name(&self, address: Address) -> String {
        self.handle.compute_name(address)
    }

    pub fn compute_id(&self, name: &str) -> Address {
        self.handle.compute_id(name)
    }

    pub fn driver_list(&self) -> Vec<String> {
        self.handle.driver_list()
    }
}
