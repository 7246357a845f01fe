//! Socket connection handles.
//!
//! A socket connection is long-lived; every inbound message is handled as its
//! own invocation and its reply is emitted back over the same connection
//! through a [`SocketHandle`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Fault;

/// Identifier of one socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new time-ordered connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// An outbound message written to a socket connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketEmission {
    /// Correlation id copied from the inbound message, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Path of the inbound message this replies to.
    pub path: String,
    /// Status code.
    pub status: u16,
    /// Headers as a flat string map.
    #[serde(default)]
    pub headers: serde_json::Map<String, Value>,
    /// Payload.
    pub body: Value,
}

impl SocketEmission {
    /// Creates an emission not tied to any inbound message, e.g. a push.
    pub fn push(path: impl Into<String>, body: Value) -> Self {
        Self {
            id: None,
            path: path.into(),
            status: StatusCode::OK.as_u16(),
            headers: serde_json::Map::new(),
            body,
        }
    }
}

/// Write side of one socket connection.
///
/// Cloning the handle is cheap; every clone writes to the same connection.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<SocketEmission>,
}

impl SocketHandle {
    /// Creates a handle and the receiver that drains its emissions.
    #[must_use]
    pub fn channel(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<SocketEmission>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { id, outbound }, rx)
    }

    /// Connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns true once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Queues an emission on the connection.
    pub fn emit(&self, emission: SocketEmission) -> Result<(), Fault> {
        self.outbound.send(emission).map_err(|_| {
            Fault::system(format!("socket connection {} is closed", self.id))
        })
    }
}
