//! Application state.

use std::time::Duration;

use fleet_core::instance::InstanceRegistry;

use crate::hub::HubHandle;
use crate::processor::CommandProcessor;

/// Application state shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub hub: HubHandle,
}

impl AppState {
    /// Spawn the hub on the current runtime and wrap its handle.
    pub fn new(instances: InstanceRegistry, command_delay: Duration) -> Self {
        let processor = CommandProcessor::new(instances, command_delay);
        Self {
            hub: HubHandle::spawn(processor),
        }
    }
}
