use chrono::Local;
use obd::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::assembly::DriverAddress;

/// Persisted clock parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub pool_server: String,
    pub time_zone: String,
    pub date_format: String,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            pool_server: "pool.ntp.org".to_string(),
            time_zone: "CET-1CEST,M3.5.0,M10.5.0/3".to_string(),
            date_format: "%a %b %e %H:%M:%S %Y".to_string(),
        }
    }
}

/// Read-only view of the clock, handed out through `link_node`
#[derive(Debug, Clone)]
pub struct ClockHandle {
    ticks: Arc<AtomicU64>,
    started: Instant,
}

impl ClockHandle {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// System time driver
pub struct Clock {
    handle: ClockHandle,
    settings: ClockSettings,
    config_path: Option<PathBuf>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            handle: ClockHandle {
                ticks: Arc::new(AtomicU64::new(0)),
                started: Instant::now(),
            },
            settings: ClockSettings::default(),
            config_path: None,
        }
    }

    /// Persist settings to `path` through the config hooks
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn handle(&self) -> ClockHandle {
        self.handle.clone()
    }

    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    pub fn date(&self) -> String {
        Local::now().format(&self.settings.date_format).to_string()
    }

    fn uptime_report(&self) -> String {
        format!(
            "up {}s, {} ticks",
            self.handle.uptime().as_secs(),
            self.handle.ticks()
        )
    }
}

impl Node for Clock {
    fn name(&self) -> &'static str {
        "Clock"
    }

    fn address(&self) -> Address {
        DriverAddress::Clock.address()
    }

    fn category(&self) -> Category {
        Category::Hardware
    }

    fn info(&self) -> String {
        let mut out = Message::new(self.address(), Address::BROADCAST);
        out.println(" ----- CLOCK INFORMATION -----");
        out.print("Pool server       : ");
        out.println(&self.settings().pool_server);
        out.print("Time Zone         : ");
        out.print(&self.settings().time_zone);
        out.payload().to_string()
    }

    fn pre_treatment(&mut self, _ctx: &mut NodeInfo) {
        self.handle.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn accepts_command(&self, message: &Message) -> bool {
        matches!(
            message.base_command(),
            "date" | "uptime" | "clockpool" | "clocktz"
        )
    }

    fn treat_message(&mut self, ctx: &mut NodeInfo, message: &Message) -> bool {
        if message.message_type() != MessageType::Command {
            return false;
        }
        let reply = match message.base_command() {
            "date" => self.date(),
            "uptime" => self.uptime_report(),
            "clockpool" | "clocktz" if message.params().is_empty() => {
                ctx.broadcast_to(
                    message.source(),
                    format!("{} needs a parameter", message.base_command()),
                    MessageType::Error,
                );
                return true;
            }
            "clockpool" => {
                self.settings.pool_server = message.params().join(" ");
                format!("Pool server set to {}", self.settings.pool_server)
            }
            "clocktz" => {
                self.settings.time_zone = message.params().join(" ");
                format!("Time zone set to {}", self.settings.time_zone)
            }
            _ => return false,
        };
        ctx.broadcast_to(message.source(), reply, MessageType::Reply);
        true
    }

    fn load_config(&mut self, _ctx: &mut NodeInfo) -> ObdResult<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        if !path.exists() {
            tracing::debug!("No clock config at {}, keeping defaults", path.display());
            return Ok(());
        }
        let contents = std::fs::read_to_string(path)?;
        self.settings = toml::from_str(&contents)
            .map_err(|e| ObdError::config(format!("invalid clock config: {}", e)))?;
        Ok(())
    }

    fn save_config(&self, _ctx: &NodeInfo) -> ObdResult<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        let contents = toml::to_string_pretty(&self.settings)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
