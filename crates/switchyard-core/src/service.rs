//! Service registry.
//!
//! Services are already-constructed collaborators (database clients, queues,
//! caches) that controllers reach through the shared [`Globals`](crate::Globals).
//! Each declares an identifier of the form `namespace:instance` which is the
//! alias it is registered under.
//!
//! # Example
//!
//! ```rust
//! use switchyard_core::{Service, ServiceRegistry};
//!
//! struct Cache;
//!
//! impl Service for Cache {
//!     fn service(&self) -> &str {
//!         "cache:main"
//!     }
//! }
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register(Cache).unwrap();
//!
//! let cache = registry.get::<Cache>("cache:main");
//! assert!(cache.is_some());
//! assert!(registry.register(Cache).is_err());
//! ```

use std::any::Any;
use std::sync::Arc;

use futures_util::future::join_all;
use indexmap::IndexMap;

use crate::error::Fault;
use crate::BoxFuture;

/// A collaborator exposed to controllers through the globals.
///
/// `connect` and `end` are lifecycle hooks for process bootstrap and
/// shutdown code; invocations never call them.
pub trait Service: Send + Sync + 'static {
    /// Alias the service is registered under, e.g. `db:main`.
    fn service(&self) -> &str;

    /// Opens the underlying connection.
    fn connect(&self) -> BoxFuture<'_, Result<(), Fault>> {
        Box::pin(async { Ok(()) })
    }

    /// Closes the underlying connection.
    fn end(&self) -> BoxFuture<'_, Result<(), Fault>> {
        Box::pin(async { Ok(()) })
    }
}

/// A service ready to be registered: the trait object plus a typed view for
/// downcasting.
#[derive(Clone)]
pub struct ServiceEntry {
    alias: String,
    service: Arc<dyn Service>,
    typed: Arc<dyn Any + Send + Sync>,
}

impl ServiceEntry {
    /// Wraps a service.
    pub fn new<S: Service>(service: S) -> Self {
        Self::from_arc(Arc::new(service))
    }

    /// Wraps a shared service.
    pub fn from_arc<S: Service>(service: Arc<S>) -> Self {
        Self {
            alias: service.service().to_string(),
            service: service.clone(),
            typed: service,
        }
    }

    /// Alias the service declared.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

impl<S: Service> From<S> for ServiceEntry {
    fn from(service: S) -> Self {
        Self::new(service)
    }
}

/// Services keyed by alias, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: IndexMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its declared alias.
    ///
    /// Fails with a system fault if the alias is empty or already taken; the
    /// existing registration is kept.
    pub fn register(&mut self, service: impl Into<ServiceEntry>) -> Result<(), Fault> {
        self.insert(service.into())
    }

    /// Registers several services in order, stopping at the first collision.
    pub fn register_all<I>(&mut self, services: I) -> Result<(), Fault>
    where
        I: IntoIterator,
        I::Item: Into<ServiceEntry>,
    {
        services
            .into_iter()
            .try_for_each(|service| self.insert(service.into()))
    }

    fn insert(&mut self, entry: ServiceEntry) -> Result<(), Fault> {
        if entry.alias.trim().is_empty() {
            return Err(Fault::system("service declares an empty identifier"));
        }
        if self.entries.contains_key(&entry.alias) {
            return Err(Fault::system(format!(
                "service alias '{}' is already registered",
                entry.alias
            )));
        }
        tracing::debug!(service = %entry.alias, "service registered");
        self.entries.insert(entry.alias.clone(), entry);
        Ok(())
    }

    /// Returns the service registered under `alias` as a trait object.
    #[must_use]
    pub fn service(&self, alias: &str) -> Option<Arc<dyn Service>> {
        self.entries.get(alias).map(|e| Arc::clone(&e.service))
    }

    /// Returns the service registered under `alias` as its concrete type.
    #[must_use]
    pub fn get<T: Service>(&self, alias: &str) -> Option<Arc<T>> {
        self.entries
            .get(alias)
            .and_then(|e| Arc::clone(&e.typed).downcast::<T>().ok())
    }

    /// Returns true if `alias` is taken.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Aliases in registration order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `connect` on every service concurrently, returning every
    /// failure paired with its alias.
    pub async fn connect_all(&self) -> Vec<(String, Fault)> {
        let calls = self.entries.values().map(|e| async move {
            e.service.connect().await.err().map(|f| (e.alias.clone(), f))
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Calls `end` on every service in reverse registration order.
    pub async fn end_all(&self) -> Vec<(String, Fault)> {
        let mut failures = Vec::new();
        for entry in self.entries.values().rev() {
            if let Err(fault) = entry.service.end().await {
                failures.push((entry.alias.clone(), fault));
            }
        }
        failures
    }
}
