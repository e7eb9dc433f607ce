//! Events pushed from the server to connected clients.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::instance::model::Instance;

/// Display format of event timestamps: `HH:MM:SS DD.MM.YY`.
const TIMESTAMP_FORMAT: &str = "%H:%M:%S %d.%m.%y";

/// Outbound WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Initial { instances: Vec<Instance> },
    Received { action: String, id: String, ts: String },
    Created { id: String, ts: String },
    Started { id: String, ts: String },
    Stopped { id: String, ts: String },
    Removed { id: String, ts: String },
    Error { id: String, ts: String },
}

impl Event {
    /// Snapshot of the registry for a newly connected client.
    pub fn initial(instances: &[Instance]) -> Self {
        Self::Initial {
            instances: instances.to_vec(),
        }
    }

    /// Acknowledgment that a command was accepted and scheduled.
    pub fn received(action: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Received {
            action: action.into(),
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    pub fn created(id: impl Into<String>) -> Self {
        Self::Created {
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    pub fn started(id: impl Into<String>) -> Self {
        Self::Started {
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    pub fn stopped(id: impl Into<String>) -> Self {
        Self::Stopped {
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    pub fn removed(id: impl Into<String>) -> Self {
        Self::Removed {
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    pub fn error(id: impl Into<String>) -> Self {
        Self::Error {
            id: id.into(),
            ts: timestamp_now(),
        }
    }

    /// Wire name of the event, as found in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Received { .. } => "received",
            Self::Created { .. } => "created",
            Self::Started { .. } => "started",
            Self::Stopped { .. } => "stopped",
            Self::Removed { .. } => "removed",
            Self::Error { .. } => "error",
        }
    }

    /// Instance id the event refers to, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Initial { .. } => None,
            Self::Received { id, .. }
            | Self::Created { id, .. }
            | Self::Started { id, .. }
            | Self::Stopped { id, .. }
            | Self::Removed { id, .. }
            | Self::Error { id, .. } => Some(id),
        }
    }
}

/// Render a timestamp as `HH:MM:SS DD.MM.YY`.
pub fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in event format.
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}
