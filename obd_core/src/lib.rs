//! # OBD Core
//!
//! The message-passing kernel of the OBD onboard controller firmware.
//!
//! Every driver of the controller (storage, network, camera control, status
//! light, clock, console) is a [`Node`]. Drivers never hold references to each
//! other: they talk exclusively through typed [`Message`]s that the
//! [`Messenger`] routes once per tick.
//!
//! - **Message**: address pair, type tag and a text payload (free text or command line)
//! - **Node**: addressable unit of computation with a bounded per-tick inbox drain
//! - **Manager**: insertion-ordered registry, one node per address
//! - **Messenger**: outbound FIFO with a per-tick routing budget
//! - **System**: assembles the above and drives the fixed-rate tick loop
//!
//! ## Quick Start
//!
//! ```rust
//! use obd_core::{Address, KernelConfig, Message, MessageType, Node, NodeInfo, System};
//!
//! struct Led;
//!
//! impl Node for Led {
//!     fn name(&self) -> &'static str { "Led" }
//!     fn address(&self) -> Address { Address::new(7) }
//!     fn info(&self) -> String { "status light".into() }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! }
//!
//! let mut system = System::new(KernelConfig::default()).unwrap();
//! system.add_node(Box::new(Led));
//! system.init();
//! system
//!     .messenger()
//!     .push_message(Message::command(Address::BROADCAST, Address::new(7), "info"));
//! system.tick();
//! ```

pub mod communication;
pub mod core;
pub mod error;
pub mod params;
pub mod scheduling;

// Re-export commonly used types for easy access
pub use communication::{Messenger, MessengerHandle, Statistics};
pub use core::{
    Address, Category, Format, Message, MessageInteger, MessageType, Node, NodeInfo, NodeMetrics,
    NodeState, RegisteredNode,
};
pub use error::{ObdError, ObdResult};
pub use params::KernelConfig;
pub use scheduling::{Manager, System};
