use crossbeam::channel::{unbounded, Receiver, TryRecvError};
use obd::prelude::*;
use std::any::Any;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assembly::DriverAddress;

/// Lines forwarded per tick at most
pub const MAX_LINES_PER_TICK: usize = 8;

/// Terminal input driver.
///
/// A reader thread blocks on stdin and feeds a channel; every tick the node
/// forwards what is available as `Input` messages to its target console.
/// `quit` and `exit` stop the system instead.
pub struct StdinSource {
    target: Address,
    lines: Option<Receiver<String>>,
    stop: Option<Arc<AtomicBool>>,
    disconnected: bool,
}

impl StdinSource {
    /// Read the process stdin once initialized
    pub fn new(target: Address) -> Self {
        Self {
            target,
            lines: None,
            stop: None,
            disconnected: false,
        }
    }

    /// Read lines from an existing channel instead of stdin
    pub fn from_receiver(target: Address, lines: Receiver<String>) -> Self {
        Self {
            lines: Some(lines),
            ..Self::new(target)
        }
    }

    /// Flag cleared by `quit`/`exit` (builder pattern)
    pub fn with_stop_handle(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn spawn_reader() -> ObdResult<Receiver<String>> {
        let (tx, rx) = unbounded();
        std::thread::Builder::new()
            .name("obd-stdin".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to read stdin: {}", e);
                            break;
                        }
                    }
                }
            })?;
        Ok(rx)
    }

    fn forward(&mut self, ctx: &mut NodeInfo, line: &str) {
        let line = line.trim();
        match line {
            "" => {}
            "quit" | "exit" => match &self.stop {
                Some(stop) => {
                    tracing::info!("Stop requested from the terminal");
                    stop.store(false, Ordering::SeqCst);
                }
                None => ctx.console("No system to stop", MessageType::Warning),
            },
            _ => ctx.broadcast_to(self.target, line, MessageType::Input),
        }
    }
}

impl Node for StdinSource {
    fn name(&self) -> &'static str {
        "Stdin"
    }

    fn address(&self) -> Address {
        DriverAddress::Stdin.address()
    }

    fn category(&self) -> Category {
        Category::Communicator
    }

    fn info(&self) -> String {
        format!("Terminal input forwarded to {}", self.target)
    }

    fn init(&mut self, _ctx: &mut NodeInfo) -> ObdResult<()> {
        if self.lines.is_none() {
            self.lines = Some(Self::spawn_reader()?);
        }
        Ok(())
    }

    fn pre_treatment(&mut self, ctx: &mut NodeInfo) {
        let Some(lines) = self.lines.clone() else {
            return;
        };
        for _ in 0..MAX_LINES_PER_TICK {
            match lines.try_recv() {
                Ok(line) => self.forward(ctx, &line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::info!("Terminal input closed");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
    }

    fn terminate(&mut self, _ctx: &mut NodeInfo) {
        // the reader thread stays blocked on stdin until the process exits
        self.lines = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
