use colored::Colorize;
use obd::prelude::*;
use std::any::Any;
use std::io::Write;

use super::clock::{Clock, ClockHandle};
use crate::assembly::DriverAddress;

/// Error shown when a driver is named without anything to run
pub const MISSING_COMMAND: &str = "Driver name alone need a command.";

/// Error shown when an input line matches neither a shell command nor a driver
pub const UNKNOWN_COMMAND: &str = "Unknown command";

/// The system's console.
///
/// Renders every human-readable message it receives to its output and
/// turns `Input` lines into shell commands or driver commands:
/// `<driver> <command...>` is routed as a `Command` to that driver.
pub struct Shell {
    output: Box<dyn Write + Send>,
    clock: Option<ClockHandle>,
}

impl Shell {
    pub fn new(output: Box<dyn Write + Send>) -> Self {
        Self {
            output,
            clock: None,
        }
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    fn stamp(&self) -> String {
        match &self.clock {
            Some(clock) => format!("[{:>6}] ", clock.ticks()),
            None => String::new(),
        }
    }

    fn write_line(&mut self, line: String) {
        if let Err(e) = writeln!(self.output, "{}", line).and_then(|_| self.output.flush()) {
            tracing::warn!("Shell output failed: {}", e);
        }
    }

    /// Render a message coming from `source`
    fn output(&mut self, source: &str, text: &str, message_type: MessageType) {
        let line = format!("{}{}: {}", self.stamp(), source, text);
        let line = match message_type {
            MessageType::Error => line.red().to_string(),
            MessageType::Warning => line.yellow().to_string(),
            MessageType::Reply => line.cyan().to_string(),
            _ => line,
        };
        self.write_line(line);
    }

    /// Render a message produced by the shell itself
    fn output_local(&mut self, text: &str, message_type: MessageType) {
        self.output(self.name(), text, message_type);
    }

    fn echo(&mut self, line: &str) {
        let line = format!("{}> {}", self.stamp(), line).bold().to_string();
        self.write_line(line);
    }

    fn treat_input(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
        self.echo(message.payload());
        if message.payload().trim().is_empty() {
            return true;
        }
        if self.shell_command(ctx, message) {
            return true;
        }
        let driver = ctx.compute_id(message.base_command());
        if !driver.is_broadcast() {
            if message.params().is_empty() {
                self.output_local(MISSING_COMMAND, MessageType::Error);
            } else {
                ctx.broadcast_to(driver, message.param_str().trim(), MessageType::Command);
            }
            return true;
        }
        self.output_local(UNKNOWN_COMMAND, MessageType::Error);
        false
    }

    fn shell_command(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
        match message.base_command() {
            "lsdrv" => self.lsdrv(ctx),
            "dmesg" => self.dmesg(ctx),
            "stats" => self.stats(ctx),
            _ => return false,
        }
        true
    }

    fn lsdrv(&mut self, ctx: &NodeInfo) {
        self.output_local("List of drivers", MessageType::Message);
        for driver in ctx.driver_list() {
            self.output_local(&driver, MessageType::Message);
        }
    }

    fn dmesg(&mut self, ctx: &NodeInfo) {
        self.output_local(
            &format!(
                "System {} {} ({}), {} drivers",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::ARCH,
                ctx.driver_list().len()
            ),
            MessageType::Message,
        );
        if let Some(clock) = &self.clock {
            let uptime = format!(
                "Uptime {}s, {} ticks",
                clock.uptime().as_secs(),
                clock.ticks()
            );
            self.output_local(&uptime, MessageType::Message);
        }
    }

    fn stats(&mut self, ctx: &NodeInfo) {
        let Some(messenger) = ctx.messenger() else {
            return;
        };
        match serde_json::to_string(&messenger.stats()) {
            Ok(json) => self.output_local(&json, MessageType::Message),
            Err(e) => self.output_local(&e.to_string(), MessageType::Error),
        }
    }
}

impl Node for Shell {
    fn name(&self) -> &'static str {
        "Shell"
    }

    fn address(&self) -> Address {
        DriverAddress::Shell.address()
    }

    fn category(&self) -> Category {
        Category::Console
    }

    fn info(&self) -> String {
        let clock = if self.has_clock() { "linked" } else { "none" };
        format!(
            "Shell console: lsdrv, dmesg, stats, <driver> <command> (clock: {})",
            clock
        )
    }

    fn treat_message(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
        match message.message_type() {
            MessageType::Input => self.treat_input(ctx, message),
            MessageType::Command => false,
            message_type => {
                let source = ctx.compute_name(message.source());
                self.output(&source, message.payload(), message_type);
                true
            }
        }
    }

    fn link_node(&mut self, other: &dyn Node) -> bool {
        match other.as_any().downcast_ref::<Clock>() {
            Some(clock) => {
                self.clock = Some(clock.handle());
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
