//! Drivers assembled into the firmware

pub mod clock;
pub mod shell;
pub mod stdin;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::Clock;
pub use shell::Shell;
pub use stdin::StdinSource;
