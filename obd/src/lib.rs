//! # OBD - onboard controller driver framework
//!
//! Drivers of the controller are [`Node`]s wired together by a
//! message-passing kernel and driven by a fixed-rate tick loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use obd::prelude::*;
//!
//! pub struct StatusLight {
//!     blinking: bool,
//! }
//!
//! impl Node for StatusLight {
//!     fn name(&self) -> &'static str { "StatusLight" }
//!     fn address(&self) -> Address { Address::new(4) }
//!     fn category(&self) -> Category { Category::Hardware }
//!
//!     fn accepts_command(&self, message: &Message) -> bool {
//!         matches!(message.base_command(), "blink" | "off")
//!     }
//!
//!     fn treat_message(&mut self, _ctx: &mut NodeInfo, message: &Message) -> bool {
//!         match message.base_command() {
//!             "blink" => self.blinking = true,
//!             "off" => self.blinking = false,
//!             _ => return false,
//!         }
//!         true
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! }
//!
//! fn main() -> AnyResult<()> {
//!     let mut system = System::new(KernelConfig::default())?;
//!     system.add_node(Box::new(StatusLight { blinking: false }));
//!     system.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Address-based routing** with a broadcast address
//! - **Bounded per-tick work** at the messenger and at every node
//! - **Typed driver lookup** and direct driver links outside the protocol

// Re-export core components
pub use obd_core::{self, *};

/// The OBD prelude - everything a driver needs
pub mod prelude {
    // Core node types
    pub use obd_core::core::{
        Address, Category, Format, Message, MessageType, Node, NodeInfo, NodeState,
    };

    // Routing and scheduling
    pub use obd_core::communication::{Messenger, MessengerHandle, Statistics};
    pub use obd_core::scheduling::{Manager, System};
    pub use obd_core::params::KernelConfig;

    // Error types
    pub use obd_core::error::{ObdError, ObdResult};
    pub type Result<T> = ObdResult<T>;

    // Common std types
    pub use std::sync::{Arc, Mutex};
    pub use std::time::{Duration, Instant};

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get OBD version
pub fn version() -> &'static str {
    VERSION
}
