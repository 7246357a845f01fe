//! Socket runtime.
//!
//! A connection is long-lived; every message on it is its own invocation.
//! Messages are JSON frames:
//!
//! ```json
//! { "id": "m-1", "path": "/chat/lobby", "headers": {}, "body": { "text": "hi" } }
//! ```
//!
//! The reply is emitted on the same connection as a
//! [`SocketEmission`] carrying the frame's `id`, so clients can correlate
//! replies with messages even when message pipelines interleave.
//!
//! [`SocketHub`] tracks open connections and dispatches each message as its
//! own task.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use switchyard_core::{
    ConnectionId, Fault, Inbound, RawEvent, Response, RouteMethod, RuntimeKind, SocketEmission,
    SocketHandle,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{header_map, parse_query, string_map, Decoded, Event, Malformed, ReplyTarget};
use crate::app::Application;

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    id: Option<Value>,
    path: String,
    #[serde(default)]
    query: Option<Map<String, Value>>,
    #[serde(default)]
    headers: Option<Map<String, Value>>,
    #[serde(default)]
    body: Value,
}

fn correlation_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn decode(handle: SocketHandle, message: Value) -> Decoded {
    let runtime = RuntimeKind::Socket;
    let correlation = correlation_id(message.get("id"));

    let frame = match Frame::deserialize(&message) {
        Ok(frame) => frame,
        Err(e) => {
            let path = message
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Decoded {
                call: Err(Malformed::new(runtime, RouteMethod::Socket, &path, e)),
                target: ReplyTarget::Socket {
                    handle,
                    correlation,
                    path,
                },
            };
        }
    };

    let (path, inline_query) = match frame.path.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (frame.path.clone(), None),
    };

    let mut inbound = Inbound::new(runtime, RouteMethod::Socket, path);
    let call = match inline_query.map(|q| parse_query(&q)).transpose() {
        Ok(query) => {
            inbound.query = query.unwrap_or_default();
            inbound.query.extend(string_map(frame.query.as_ref()));
            inbound.headers = header_map(frame.headers.as_ref());
            inbound.body = frame.body;
            inbound.raw = RawEvent::new(message);
            Ok(inbound)
        }
        Err(fault) => Err(Malformed::with_fault(fault, &inbound)),
    };

    Decoded {
        call,
        target: ReplyTarget::Socket {
            handle,
            correlation,
            path: frame.path,
        },
    }
}

pub(crate) fn emit(handle: &SocketHandle, id: Option<String>, path: String, response: &Response) {
    let emission = SocketEmission {
        id,
        path,
        status: response.status().as_u16(),
        headers: response.headers_json(),
        body: response.body().clone(),
    };
    if let Err(fault) = handle.emit(emission) {
        tracing::warn!(connection_id = %handle.id(), error = %fault, "reply dropped, connection closed");
    }
}

/// Open socket connections of one application.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use switchyard::{Application, SocketHub};
/// use serde_json::json;
///
/// # async fn demo(app: Arc<Application>) -> Result<(), switchyard::core::Fault> {
/// let hub = SocketHub::new(app);
/// let (id, mut replies) = hub.connect();
///
/// hub.dispatch(id, json!({ "id": "1", "path": "/chat/lobby", "body": "hi" }))?;
/// let reply = replies.recv().await;
/// hub.disconnect(&id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SocketHub {
    app: Arc<Application>,
    connections: DashMap<ConnectionId, SocketHandle>,
}

impl SocketHub {
    /// Creates a hub dispatching to `app`.
    #[must_use]
    pub fn new(app: Arc<Application>) -> Self {
        Self {
            app,
            connections: DashMap::new(),
        }
    }

    /// Opens a connection. The receiver yields every emission written to
    /// it, replies and pushes alike.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<SocketEmission>) {
        let id = ConnectionId::new();
        let (handle, rx) = SocketHandle::channel(id);
        self.connections.insert(id, handle);
        tracing::debug!(connection_id = %id, total = self.connections.len(), "socket connected");
        (id, rx)
    }

    /// Dispatches one message as its own task.
    ///
    /// Fails with a system fault if the connection is unknown or closed, or
    /// if no tokio runtime is running.
    pub fn dispatch(&self, id: ConnectionId, message: Value) -> Result<JoinHandle<()>, Fault> {
        let handle = self.handle(&id)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Fault::system_with_source("socket dispatch needs a tokio runtime", e))?;

        let app = Arc::clone(&self.app);
        Ok(runtime.spawn(async move {
            app.run(Event::socket(handle, message)).await;
        }))
    }

    /// Writes an emission to one connection outside any invocation.
    pub fn push(&self, id: &ConnectionId, emission: SocketEmission) -> Result<(), Fault> {
        self.handle(id)?.emit(emission)
    }

    /// Writes an emission to every open connection. Returns how many
    /// received it.
    pub fn broadcast(&self, emission: &SocketEmission) -> usize {
        self.prune();
        self.connections
            .iter()
            .filter(|entry| entry.value().emit(emission.clone()).is_ok())
            .count()
    }

    /// Forgets a connection. Returns false if it was not open.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            tracing::debug!(connection_id = %id, "socket disconnected");
        }
        removed
    }

    /// Returns true if the connection is open.
    #[must_use]
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections
            .get(id)
            .is_some_and(|handle| !handle.is_closed())
    }

    /// Number of tracked connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connection is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn handle(&self, id: &ConnectionId) -> Result<SocketHandle, Fault> {
        let handle = self
            .connections
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Fault::system(format!("socket connection {id} is not open")))?;

        if handle.is_closed() {
            self.connections.remove(id);
            return Err(Fault::system(format!("socket connection {id} is closed")));
        }
        Ok(handle)
    }

    /// Drops connections whose receiving side is gone.
    fn prune(&self) {
        self.connections.retain(|_, handle| !handle.is_closed());
    }
}
