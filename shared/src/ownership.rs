//! One-shot gate granting local simulation authority over a spawned entity.

use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipGate {
    local: u32,
    enabled: bool,
}

impl OwnershipGate {
    /// New gates start disabled.
    pub fn new(local: u32) -> Self {
        Self {
            local,
            enabled: false,
        }
    }

    pub fn local(&self) -> u32 {
        self.local
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables the gate if `target` names the local identity.
    ///
    /// Returns true only on the disabled-to-enabled transition; signals for
    /// other identities and repeated deliveries are no-ops.
    pub fn enable(&mut self, target: u32) -> bool {
        if target != self.local || self.enabled {
            return false;
        }

        self.enabled = true;
        info!("Simulation authority granted to {}", self.local);
        true
    }
}
