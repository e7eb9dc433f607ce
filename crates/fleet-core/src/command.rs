//! Inbound client commands.
//!
//! A command goes through two phases. [`Command::decode`] validates a raw
//! payload and assigns an id to `create` requests that lack one; the caller
//! acknowledges it right away. Later, once the provisioning delay has
//! elapsed, [`apply`] performs the registry mutation and yields the event to
//! broadcast.

use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{FleetError, FleetResult};
use crate::event::Event;
use crate::instance::model::InstanceState;
use crate::instance::InstanceRegistry;

/// Lifecycle action requested by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Start,
    Stop,
    Remove,
    /// Unrecognised action; acknowledged but never applied.
    Other(String),
}

impl Action {
    /// Parse from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "create" => Self::Create,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "remove" => Self::Remove,
            other => Self::Other(other.to_string()),
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
            Self::Other(other) => other,
        }
    }
}

/// Raw payload as sent by clients.
#[derive(Deserialize)]
struct InboundCommand {
    action: String,
    #[serde(default)]
    id: Option<String>,
}

/// A validated command with its target id resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub id: String,
}

impl Command {
    pub fn new(action: Action, id: impl Into<String>) -> Self {
        Self {
            action,
            id: id.into(),
        }
    }

    /// Decode a raw client payload.
    ///
    /// An absent or empty id is replaced by a fresh UUID for `create` and
    /// rejected with [`FleetError::MissingId`] for anything else.
    pub fn decode(raw: &str) -> FleetResult<Self> {
        let inbound: InboundCommand = serde_json::from_str(raw)?;
        let action = Action::parse(&inbound.action);

        let id = match inbound.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None if action == Action::Create => Uuid::new_v4().to_string(),
            None => return Err(FleetError::missing_id(inbound.action)),
        };

        Ok(Self { action, id })
    }

    /// Acknowledgment broadcast as soon as the command is accepted.
    pub fn received(&self) -> Event {
        Event::received(self.action.as_str(), &self.id)
    }
}

/// Apply a command to the registry.
///
/// Returns the event describing the outcome, or `None` when an unrecognised
/// action targets an existing instance.
pub fn apply(registry: &mut InstanceRegistry, command: &Command) -> Option<Event> {
    let id = command.id.as_str();

    let outcome = match &command.action {
        Action::Create => registry.create(id).map(|_| Event::created(id)),
        Action::Start => registry
            .set_state(id, InstanceState::Running)
            .map(|_| Event::started(id)),
        Action::Stop => registry
            .set_state(id, InstanceState::Stopped)
            .map(|_| Event::stopped(id)),
        Action::Remove => registry.remove(id).map(|_| Event::removed(id)),
        Action::Other(action) => match registry.find(id) {
            Ok(_) => {
                debug!(id, action = %action, "Ignoring unrecognised action");
                return None;
            }
            Err(e) => Err(e),
        },
    };

    match outcome {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(id, action = command.action.as_str(), error = %e, "Command failed");
            Some(Event::error(id))
        }
    }
}
