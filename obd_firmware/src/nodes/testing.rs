//! Helpers shared by the node tests

use obd::prelude::*;
use std::any::Any;
use std::io::Write;

pub(crate) const PROBE: Address = Address::new(99);

/// Records every message it treats
#[derive(Default)]
pub(crate) struct Probe {
    pub received: Vec<Message>,
}

impl Node for Probe {
    fn name(&self) -> &'static str {
        "Probe"
    }
    fn address(&self) -> Address {
        PROBE
    }
    fn frame_budget(&self) -> Option<usize> {
        Some(64)
    }
    fn accepts_command(&self, _message: &Message) -> bool {
        true
    }
    fn treat_message(&mut self, _ctx: &mut NodeInfo, message: &Message) -> bool {
        self.received.push(message.clone());
        true
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Initialized system holding a probe followed by `nodes`
pub(crate) fn system_with(nodes: Vec<Box<dyn Node>>) -> System {
    let mut system = System::new(KernelConfig::default())
        .unwrap()
        .without_signal_handler();
    assert!(system.add_node(Box::<Probe>::default()));
    for node in nodes {
        assert!(system.add_node(node));
    }
    system.init();
    system
}

pub(crate) fn probe(system: &System) -> &Probe {
    system.get_node::<Probe>().unwrap()
}

/// Command sent on behalf of the probe
pub(crate) fn command(destination: Address, line: &str) -> Message {
    Message::command(PROBE, destination, line)
}

/// In-memory terminal
#[derive(Clone, Default)]
pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
