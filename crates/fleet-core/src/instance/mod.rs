//! Instance registry.

pub mod model;

use crate::error::{FleetError, FleetResult};
use model::{Instance, InstanceState};

/// Instances every fresh server starts with unless told otherwise.
const DEMO_INSTANCES: &[(&str, InstanceState)] = &[
    ("1", InstanceState::Running),
    ("2", InstanceState::Stopped),
];

/// In-memory, insertion-ordered collection of instances.
///
/// Ids are unique at all times. The registry holds no locks: it is owned by
/// a single task that serializes every mutation.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    instances: Vec<Instance>,
}

impl InstanceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the demo instances.
    pub fn with_demo_instances() -> Self {
        Self {
            instances: DEMO_INSTANCES
                .iter()
                .map(|(id, state)| Instance::new(*id, *state))
                .collect(),
        }
    }

    /// Append a new stopped instance.
    pub fn create(&mut self, id: &str) -> FleetResult<Instance> {
        if self.position(id).is_some() {
            return Err(FleetError::DuplicateId(id.to_string()));
        }

        let instance = Instance::new(id, InstanceState::Stopped);
        self.instances.push(instance.clone());
        Ok(instance)
    }

    /// Get an instance by ID.
    pub fn find(&self, id: &str) -> FleetResult<&Instance> {
        self.instances
            .iter()
            .find(|instance| instance.id == id)
            .ok_or_else(|| FleetError::InstanceNotFound(id.to_string()))
    }

    /// Move an instance to a new state.
    pub fn set_state(&mut self, id: &str, state: InstanceState) -> FleetResult<Instance> {
        let idx = self
            .position(id)
            .ok_or_else(|| FleetError::InstanceNotFound(id.to_string()))?;

        self.instances[idx].state = state;
        Ok(self.instances[idx].clone())
    }

    /// Remove an instance, returning the removed record.
    pub fn remove(&mut self, id: &str) -> FleetResult<Instance> {
        let idx = self
            .position(id)
            .ok_or_else(|| FleetError::InstanceNotFound(id.to_string()))?;

        Ok(self.instances.remove(idx))
    }

    /// All instances in insertion order.
    pub fn list(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.instances.iter().position(|instance| instance.id == id)
    }
}
