//! # Core types and traits of the OBD kernel
//!
//! - **Address**: identity of a node kind on the bus (`0` is broadcast)
//! - **Message**: the only unit of driver-to-driver communication
//! - **Node**: the trait every driver implements
//! - **NodeInfo**: kernel-owned per-node context (inbox, state, outbound primitives)
//!
//! ## Node Lifecycle
//!
//! 1. **Construction** - the assembler builds the node and hands it to the Manager
//! 2. **Initialization** - `init()` succeeds only with a Messenger attached
//! 3. **Execution** - `update()` drains a bounded part of the inbox every tick
//! 4. **Termination** - `terminate()` is called at most once at shutdown

pub mod address;
pub mod message;
pub mod node;

pub use address::Address;
pub use message::{Format, Message, MessageInteger, MessageType};
pub use node::{
    Category, Node, NodeInfo, NodeMetrics, NodeState, RegisteredNode, DEFAULT_NODE_BUDGET,
    INFO_COMMAND,
};
