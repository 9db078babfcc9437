use crate::communication::Messenger;
use crate::core::{Address, Node};
use crate::error::ObdResult;
use crate::params::KernelConfig;
use crate::scheduling::Manager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Assembled kernel: one Messenger, one Manager bound to it, and the tick loop.
///
/// Every tick routes the messenger's queue first, then updates every node.
/// A message a node emits during tick N is therefore routed at tick N + 1
/// and treated by its destination in that same tick at the earliest.
pub struct System {
    manager: Manager,
    messenger: Messenger,
    config: KernelConfig,
    running: Arc<AtomicBool>,
    signal_handler: bool,
    tick_count: u64,
}

impl System {
    /// Build the messenger and a manager bound to it from a validated config
    pub fn new(config: KernelConfig) -> ObdResult<Self> {
        config.validate()?;
        let messenger = Messenger::new().with_budget(config.messenger_budget);
        messenger.set_diagnostic_sink(config.diagnostic_sink);
        let manager =
            Manager::with_messenger(messenger.handle()).with_node_budget(config.node_budget);
        Ok(Self {
            manager,
            messenger,
            config,
            running: Arc::new(AtomicBool::new(false)),
            signal_handler: true,
            tick_count: 0,
        })
    }

    /// Do not install the Ctrl+C handler in `run`/`run_for` (builder pattern)
    pub fn without_signal_handler(mut self) -> Self {
        self.signal_handler = false;
        self
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> bool {
        self.manager.add_node(node)
    }

    /// Typed access to the registered node of type `T`
    pub fn get_node<T: Node>(&self) -> Option<&T> {
        self.manager.get_driver::<T>()
    }

    pub fn get_node_mut<T: Node>(&mut self) -> Option<&mut T> {
        self.manager.get_driver_mut::<T>()
    }

    /// Hand `dependency` to `dependent` through its `link_node` hook
    pub fn link_nodes(&mut self, dependent: Address, dependency: Address) -> bool {
        let linked = self.manager.link_nodes(dependent, dependency);
        if linked {
            log::debug!(
                "Linked {} to {}",
                self.messenger.compute_name(dependent),
                self.messenger.compute_name(dependency)
            );
        } else {
            log::warn!("Could not link {} to {}", dependent, dependency);
        }
        linked
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut Manager {
        &mut self.manager
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Initialize every node in registration order
    pub fn init(&mut self) {
        self.manager.init();
        let ready = self.manager.iter().filter(|node| node.initialized()).count();
        log::info!(
            "System initialized: {}/{} nodes ready",
            ready,
            self.manager.size()
        );
    }

    pub fn initialized(&self) -> bool {
        self.manager.initialized()
    }

    /// One kernel step: route, then update every node. Returns the number of
    /// ticks performed so far; nothing happens before `init`.
    pub fn tick(&mut self) -> u64 {
        if !self.manager.initialized() {
            return self.tick_count;
        }
        let routed = self.messenger.update(&mut self.manager);
        self.manager.update();
        self.tick_count += 1;
        log::trace!("Tick {}: {} messages routed", self.tick_count, routed);
        self.tick_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run `ticks` steps back to back, without pacing
    pub fn run_ticks(&mut self, ticks: u64) -> u64 {
        for _ in 0..ticks {
            self.tick();
        }
        self.tick_count
    }

    /// Tick at the configured rate until stopped, then terminate every node
    pub fn run(&mut self) -> ObdResult<()> {
        self.run_loop(None)
    }

    /// Tick at the configured rate for `duration`, then terminate every node
    pub fn run_for(&mut self, duration: Duration) -> ObdResult<()> {
        self.run_loop(Some(duration))
    }

    fn run_loop(&mut self, duration: Option<Duration>) -> ObdResult<()> {
        self.running.store(true, Ordering::SeqCst);

        if self.signal_handler {
            let running = self.running.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                log::warn!("Ctrl+C received, stopping the system");
                running.store(false, Ordering::SeqCst);
            }) {
                log::warn!("Failed to set signal handler: {}", e);
            }
        }

        if !self.manager.initialized() {
            self.init();
        }

        let period = self.config.tick_period();
        let start_time = Instant::now();

        while self.is_running() {
            if let Some(max_duration) = duration {
                if start_time.elapsed() >= max_duration {
                    log::info!("System reached time limit of {:?}", max_duration);
                    break;
                }
            }
            if let Some(max_ticks) = self.config.max_ticks {
                if self.tick_count >= max_ticks {
                    log::info!("System reached tick limit of {}", max_ticks);
                    break;
                }
            }

            let tick_start = Instant::now();
            self.tick();
            if let Some(remaining) = period.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.terminate();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask a running loop to exit after the current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shared stop flag; storing `false` ends `run`/`run_for`
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Terminate every initialized node in registration order
    pub fn terminate(&mut self) {
        self.manager.terminate();
        let stats = self.messenger.stats();
        log::info!(
            "System terminated after {} ticks (received {}, sent {}, dropped {})",
            self.tick_count,
            stats.received,
            stats.sent,
            stats.dropped
        );
    }

    pub fn load_all_config(&mut self) -> ObdResult<()> {
        self.manager.load_all_config()
    }

    pub fn save_all_config(&self) -> ObdResult<()> {
        self.manager.save_all_config()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("nodes", &self.manager.size())
            .field("messenger", &self.messenger)
            .field("tick_count", &self.tick_count)
            .field("running", &self.is_running())
            .finish()
    }
}
