//! Workload nodes shared by the OBD benchmarks

use obd::prelude::*;
use std::any::Any;

/// Answers every `ping` command with a `pong` reply to the sender
pub struct Responder {
    address: Address,
}

impl Responder {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl Node for Responder {
    fn name(&self) -> &'static str {
        "Responder"
    }
    fn address(&self) -> Address {
        self.address
    }
    fn accepts_command(&self, message: &Message) -> bool {
        message.base_command() == "ping"
    }
    fn treat_message(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
        if message.message_type() == MessageType::Command {
            ctx.broadcast_to(message.source(), "pong", MessageType::Reply);
            return true;
        }
        false
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Consumes everything, counting treated messages
#[derive(Default)]
pub struct Counter {
    pub treated: u64,
}

impl Node for Counter {
    fn name(&self) -> &'static str {
        "Counter"
    }
    fn address(&self) -> Address {
        COUNTER
    }
    fn treat_message(&mut self, _ctx: &mut NodeInfo, _message: &Message) -> bool {
        self.treated += 1;
        true
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub const COUNTER: Address = Address::new(1);
pub const RESPONDER: Address = Address::new(2);

/// Initialized system with a counter and a responder, without signal handling
pub fn bench_system(config: KernelConfig) -> ObdResult<System> {
    let mut system = System::new(config)?.without_signal_handler();
    system.add_node(Box::<Counter>::default());
    system.add_node(Box::new(Responder::new(RESPONDER)));
    system.init();
    Ok(system)
}
