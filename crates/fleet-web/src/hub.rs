//! Event loop that serializes all state changes.
//!
//! A single task owns the [`CommandProcessor`]. Connection events, inbound
//! payloads and due timers are handled one at a time, so neither registry
//! needs a lock. Everything else talks to the loop through a [`HubHandle`].

use fleet_core::instance::model::Instance;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broadcast::{OutboundReceiver, SessionId};
use crate::processor::CommandProcessor;

enum HubMessage {
    Connect {
        session: SessionId,
        outbound: mpsc::UnboundedSender<String>,
    },
    Disconnect {
        session: SessionId,
    },
    Inbound {
        session: SessionId,
        payload: String,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Instance>>,
    },
}

/// A registered connection: its id plus the queue of events to write out.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub outbound: OutboundReceiver,
}

/// Cheap, cloneable handle to the hub task.
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubMessage>,
}

impl std::fmt::Debug for HubMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { session, .. } => write!(f, "Connect({session})"),
            Self::Disconnect { session } => write!(f, "Disconnect({session})"),
            Self::Inbound { session, .. } => write!(f, "Inbound({session})"),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
        }
    }
}

impl HubHandle {
    /// Spawn the hub task on the current runtime.
    ///
    /// The task runs until every handle is dropped and all scheduled
    /// commands have fired.
    pub fn spawn(processor: CommandProcessor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(processor, rx));
        Self { tx }
    }

    /// Open a session. The first queued event is the `initial` snapshot.
    pub fn connect(&self) -> Session {
        let id = Uuid::new_v4();
        let (outbound, rx) = mpsc::unbounded_channel();
        self.send(HubMessage::Connect {
            session: id,
            outbound,
        });
        Session { id, outbound: rx }
    }

    pub fn disconnect(&self, session: SessionId) {
        self.send(HubMessage::Disconnect { session });
    }

    /// Forward a raw inbound payload to command intake.
    pub fn submit(&self, session: SessionId, payload: impl Into<String>) {
        self.send(HubMessage::Inbound {
            session,
            payload: payload.into(),
        });
    }

    /// Current instances, or `None` if the hub has stopped.
    pub async fn snapshot(&self) -> Option<Vec<Instance>> {
        let (reply, rx) = oneshot::channel();
        self.send(HubMessage::Snapshot { reply });
        rx.await.ok()
    }

    fn send(&self, message: HubMessage) {
        if let Err(e) = self.tx.send(message) {
            warn!(request = ?e.0, "Hub is not running");
        }
    }
}

async fn run(mut processor: CommandProcessor, mut rx: mpsc::UnboundedReceiver<HubMessage>) {
    info!("Hub started");
    let mut closed = false;

    loop {
        let deadline = processor.next_deadline();
        if closed && deadline.is_none() {
            break;
        }

        tokio::select! {
            message = rx.recv(), if !closed => match message {
                Some(message) => dispatch(&mut processor, message),
                None => {
                    debug!(pending = processor.pending(), "All hub handles dropped");
                    closed = true;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                processor.fire_due(Instant::now());
            }
        }
    }

    info!("Hub stopped");
}

fn dispatch(processor: &mut CommandProcessor, message: HubMessage) {
    match message {
        HubMessage::Connect { session, outbound } => processor.connect(session, outbound),
        HubMessage::Disconnect { session } => processor.disconnect(session),
        HubMessage::Inbound { session, payload } => {
            match processor.intake(&payload, Instant::now()) {
                Ok(command) => debug!(
                    session = %session,
                    action = command.action.as_str(),
                    id = %command.id,
                    "Command accepted"
                ),
                Err(e) => warn!(session = %session, error = %e, "Discarding inbound message"),
            }
        }
        HubMessage::Snapshot { reply } => {
            let _ = reply.send(processor.instances().to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::DEFAULT_COMMAND_DELAY;
    use fleet_core::instance::model::InstanceState;
    use fleet_core::instance::InstanceRegistry;
    use serde_json::Value;

    async fn next(session: &mut Session) -> Value {
        let json = session.outbound.recv().await.expect("session closed");
        serde_json::from_str(&json).unwrap()
    }

    fn spawn_demo() -> HubHandle {
        HubHandle::spawn(CommandProcessor::new(
            InstanceRegistry::with_demo_instances(),
            DEFAULT_COMMAND_DELAY,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_scenario_two_clients() {
        let hub = spawn_demo();
        let mut a = hub.connect();
        assert_eq!(next(&mut a).await["type"], "initial");

        let started = Instant::now();
        hub.submit(a.id, r#"{"action":"create"}"#);

        let received = next(&mut a).await;
        assert_eq!(received["type"], "received");
        assert_eq!(received["action"], "create");
        let id = received["id"].as_str().unwrap().to_string();
        assert!(started.elapsed() < DEFAULT_COMMAND_DELAY);

        let mut b = hub.connect();
        let initial = next(&mut b).await;
        assert_eq!(initial["instances"].as_array().unwrap().len(), 2);

        let created_a = next(&mut a).await;
        let created_b = next(&mut b).await;
        assert!(started.elapsed() >= DEFAULT_COMMAND_DELAY);
        for created in [created_a, created_b] {
            assert_eq!(created["type"], "created");
            assert_eq!(created["id"], id.as_str());
        }

        let instances = hub.snapshot().await.unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[2], Instance::new(id, InstanceState::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_instance_scenario() {
        let hub = spawn_demo();
        let mut a = hub.connect();
        let mut b = hub.connect();
        next(&mut a).await;
        next(&mut b).await;

        hub.submit(b.id, r#"{"action":"stop","id":"999"}"#);
        for session in [&mut a, &mut b] {
            assert_eq!(next(session).await["type"], "received");
            let error = next(session).await;
            assert_eq!(error["type"], "error");
            assert_eq!(error["id"], "999");
        }

        let instances = hub.snapshot().await.unwrap();
        assert_eq!(instances, InstanceRegistry::with_demo_instances().list());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_payload_keeps_session() {
        let hub = spawn_demo();
        let mut a = hub.connect();
        next(&mut a).await;

        hub.submit(a.id, "garbage");
        hub.submit(a.id, r#"{"action":"start"}"#);
        hub.submit(a.id, r#"{"action":"start","id":"2"}"#);

        let received = next(&mut a).await;
        assert_eq!(received["type"], "received");
        assert_eq!(received["id"], "2");
        assert_eq!(next(&mut a).await["type"], "started");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_commands_fire_after_handles_drop() {
        let processor = CommandProcessor::new(InstanceRegistry::new(), DEFAULT_COMMAND_DELAY);
        let hub = HubHandle::spawn(processor);
        let mut a = hub.connect();
        next(&mut a).await;

        hub.submit(a.id, r#"{"action":"create","id":"late"}"#);
        assert_eq!(next(&mut a).await["type"], "received");
        drop(hub);

        let created = next(&mut a).await;
        assert_eq!(created["type"], "created");
        assert_eq!(created["id"], "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_delivery() {
        let hub = spawn_demo();
        let mut a = hub.connect();
        let mut b = hub.connect();
        next(&mut b).await;

        hub.disconnect(a.id);
        hub.submit(b.id, r#"{"action":"start","id":"2"}"#);
        assert_eq!(next(&mut b).await["type"], "received");

        assert_eq!(next(&mut a).await["type"], "initial");
        assert!(a.outbound.recv().await.is_none());
    }
}
