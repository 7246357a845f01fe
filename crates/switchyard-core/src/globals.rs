//! The shared globals passed to every stage and controller.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Fault;
use crate::service::{Service, ServiceEntry, ServiceRegistry};
use crate::socket::SocketHandle;

/// Read-only context shared by every invocation of one application.
///
/// Holds environment configuration and registered services. Invocations
/// arriving over a socket connection see a copy with the connection's
/// [`SocketHandle`] in the socket slot.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    env: BTreeMap<String, String>,
    services: Arc<ServiceRegistry>,
    socket: Option<SocketHandle>,
}

impl Globals {
    /// Creates empty globals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the environment configuration.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Environment configuration.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// One environment value.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Registered services.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Looks a service up by alias and concrete type.
    #[must_use]
    pub fn service<T: Service>(&self, alias: &str) -> Option<Arc<T>> {
        self.services.get(alias)
    }

    /// Registers a service. Fails with a system fault on alias collision.
    pub fn register_service(&mut self, service: impl Into<ServiceEntry>) -> Result<(), Fault> {
        Arc::make_mut(&mut self.services).register(service)
    }

    /// The socket slot; set only for invocations arriving over a socket.
    #[must_use]
    pub const fn socket(&self) -> Option<&SocketHandle> {
        self.socket.as_ref()
    }

    /// Returns a copy whose socket slot holds `handle`. Services and
    /// environment are shared, not cloned.
    #[must_use]
    pub fn with_socket(&self, handle: SocketHandle) -> Self {
        Self {
            env: self.env.clone(),
            services: Arc::clone(&self.services),
            socket: Some(handle),
        }
    }
}
