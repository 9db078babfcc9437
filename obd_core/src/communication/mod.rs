//! # Message routing
//!
//! The [`Messenger`] is the single routing point of the kernel. Nodes reach
//! it through a cloneable [`MessengerHandle`]; once per tick the messenger
//! drains a budgeted part of its outbound FIFO into the inboxes of the
//! registered nodes.

pub mod messenger;

pub use messenger::{
    Messenger, MessengerHandle, Statistics, ALL_NAME, DEFAULT_MESSENGER_BUDGET, UNKNOWN_NAME,
};
