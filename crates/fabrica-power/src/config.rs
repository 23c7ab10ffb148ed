use serde::{Deserialize, Serialize};

/// How a processing machine behaves when its network cannot cover its full
/// request for a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPower {
    /// Draw whatever is granted and progress in proportion to it.
    #[default]
    Throttle,
    /// Draw nothing unless the full request is granted.
    Stall,
}

/// Runtime configuration for the power simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub partial_power: PartialPower,
    /// Maximum items per machine slot.
    pub stack_limit: u32,
    /// Emit `MachineStatusChanged` events.
    pub status_events: bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            partial_power: PartialPower::Throttle,
            stack_limit: 64,
            status_events: true,
        }
    }
}

impl PowerConfig {
    pub fn with_partial_power(mut self, policy: PartialPower) -> Self {
        self.partial_power = policy;
        self
    }

    pub fn with_stack_limit(mut self, limit: u32) -> Self {
        self.stack_limit = limit;
        self
    }

    pub fn with_status_events(mut self, enabled: bool) -> Self {
        self.status_events = enabled;
        self
    }
}
