//! Command processor.
//!
//! Owns the instance registry, the session registry and the queue of
//! scheduled commands. Inbound payloads are acknowledged to every session
//! the moment they are accepted; the registry mutation happens once the
//! provisioning delay has elapsed.

use std::collections::VecDeque;
use std::time::Duration;

use fleet_core::command::{self, Command};
use fleet_core::event::Event;
use fleet_core::instance::model::Instance;
use fleet_core::instance::InstanceRegistry;
use fleet_core::FleetResult;
use tokio::time::Instant;
use tracing::debug;

use crate::broadcast::{OutboundSender, SessionId, SessionRegistry};

/// Simulated provisioning time between acknowledgment and effect.
pub const DEFAULT_COMMAND_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    command: Command,
}

#[derive(Debug)]
pub struct CommandProcessor {
    instances: InstanceRegistry,
    sessions: SessionRegistry,
    // Fixed delay: deadlines grow with intake order, so the queue stays sorted.
    pending: VecDeque<Scheduled>,
    delay: Duration,
}

impl CommandProcessor {
    pub fn new(instances: InstanceRegistry, delay: Duration) -> Self {
        Self {
            instances,
            sessions: SessionRegistry::new(),
            pending: VecDeque::new(),
            delay,
        }
    }

    /// Register a new session and send it the current registry snapshot.
    pub fn connect(&mut self, session: SessionId, outbound: OutboundSender) {
        self.sessions.register(session, outbound);
        self.sessions
            .send_to(session, &Event::initial(self.instances.list()));
    }

    pub fn disconnect(&mut self, session: SessionId) {
        self.sessions.unregister(session);
    }

    /// Accept a raw payload.
    ///
    /// On success the `received` acknowledgment has already been broadcast
    /// and the command is scheduled to run at `now + delay`. Errors leave
    /// everything untouched.
    pub fn intake(&mut self, raw: &str, now: Instant) -> FleetResult<Command> {
        let command = Command::decode(raw)?;

        self.sessions.broadcast(&command.received());

        let due = now + self.delay;
        debug!(
            action = command.action.as_str(),
            id = %command.id,
            pending = self.pending.len() + 1,
            "Command scheduled"
        );
        self.pending.push_back(Scheduled {
            due,
            command: command.clone(),
        });

        Ok(command)
    }

    /// Apply a command whose delay has elapsed and broadcast the outcome.
    pub fn handle(&mut self, command: &Command) {
        if let Some(event) = command::apply(&mut self.instances, command) {
            self.sessions.broadcast(&event);
        }
    }

    /// Deadline of the oldest scheduled command.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.front().map(|scheduled| scheduled.due)
    }

    /// Run every scheduled command due at or before `now`, oldest first.
    /// Returns how many ran.
    pub fn fire_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while self
            .pending
            .front()
            .is_some_and(|scheduled| scheduled.due <= now)
        {
            if let Some(scheduled) = self.pending.pop_front() {
                self.handle(&scheduled.command);
                fired += 1;
            }
        }
        fired
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn instances(&self) -> &[Instance] {
        self.instances.list()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
