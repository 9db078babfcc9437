//! System assembly: address allocation and driver wiring

use obd::prelude::*;
use std::io::Write;
use std::path::PathBuf;

use crate::nodes::{Clock, Shell, StdinSource};

/// Bus address of every driver kind of the firmware.
///
/// The single source of addresses: two kinds never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DriverAddress {
    Shell = 1,
    Clock = 2,
    Stdin = 3,
}

impl DriverAddress {
    pub const fn address(self) -> Address {
        Address::new(self as u32)
    }
}

/// Optional parts of the firmware
#[derive(Debug, Clone, Default)]
pub struct FirmwareOptions {
    /// Forward terminal input to the shell
    pub stdin: bool,
    /// Where the clock persists its settings
    pub clock_config: Option<PathBuf>,
}

/// Build the firmware system. The shell becomes the diagnostic sink unless
/// the config names another one.
pub fn assemble(
    mut config: KernelConfig,
    options: FirmwareOptions,
    output: Box<dyn Write + Send>,
) -> ObdResult<System> {
    if config.diagnostic_sink.is_none() {
        config.diagnostic_sink = Some(DriverAddress::Shell.address());
    }
    let mut system = System::new(config)?;

    system.add_node(Box::new(Shell::new(output)));

    let clock = match options.clock_config {
        Some(path) => Clock::new().with_config_path(path),
        None => Clock::new(),
    };
    system.add_node(Box::new(clock));

    if options.stdin {
        let stdin = StdinSource::new(DriverAddress::Shell.address())
            .with_stop_handle(system.stop_handle());
        system.add_node(Box::new(stdin));
    }

    system.link_nodes(DriverAddress::Shell.address(), DriverAddress::Clock.address());
    Ok(system)
}
