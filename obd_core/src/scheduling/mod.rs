//! # OBD Scheduling
//!
//! Registry and tick driver of the kernel:
//!
//! - **Manager**: owns every node, dispatches `init`/`update` in registration order
//! - **System**: owns the Manager and the Messenger and runs the tick loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use obd_core::{KernelConfig, System};
//!
//! let mut system = System::new(KernelConfig::default())?;
//! system.add_node(Box::new(clock));
//! system.add_node(Box::new(shell));
//! system.link_nodes(shell_address, clock_address);
//! system.init();
//! system.run()?; // Messenger.update then Manager.update, every tick
//! ```

pub mod manager;
pub mod system;

pub use manager::Manager;
pub use system::System;
