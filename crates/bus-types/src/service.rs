//! # Service Contract
//!
//! The seam between the kernel's data plane and whatever dispatches it.
//! A dispatcher walks an envelope's routing slip hop by hop, resolves each
//! hop's service name through a [`ServiceDirectory`], and calls
//! [`BusService::handle`]. Services communicate only by mutating the
//! envelope; they never call each other.
//!
//! Handlers are synchronous. Queueing, threading, and retry policy belong
//! to the dispatcher, not to this crate.

use crate::envelope::Envelope;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors produced by service resolution and handling.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No service is registered under the requested name.
    #[error("no service registered under `{name}`")]
    UnknownService {
        /// The name that resolved to nothing.
        name: String,
    },

    /// The service exists but does not perform the requested operation.
    #[error("service `{service}` does not support operation `{operation}`")]
    UnsupportedOperation {
        /// The service that was asked.
        service: String,
        /// The operation it refused.
        operation: String,
    },

    /// The handler ran and failed.
    #[error("service `{service}` failed: {message}")]
    Failed {
        /// The service that failed.
        service: String,
        /// What went wrong.
        message: String,
    },
}

/// Contract every service on the bus implements.
///
/// One call per hop: the dispatcher hands the envelope over, the service
/// reads and mutates it, and the outcome travels back on the envelope
/// itself (payload slots, error messages, appended routes).
pub trait BusService: Send + Sync {
    /// The name routes address this service by.
    fn name(&self) -> &str;

    /// Perform one operation against the envelope.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnsupportedOperation`] for operations outside the
    /// service's contract, [`ServiceError::Failed`] when the work itself
    /// goes wrong.
    fn handle(&self, operation: &str, envelope: &mut Envelope) -> Result<(), ServiceError>;
}

/// Shared handle to a registered service.
pub type ServiceHandle = Arc<dyn BusService>;

/// Name-to-service registry a dispatcher consults per hop.
///
/// Registration and resolution take `&self`; the directory is meant to be
/// shared behind an `Arc` between whoever wires services and whoever
/// dispatches envelopes.
pub struct ServiceDirectory {
    services: RwLock<HashMap<String, ServiceHandle>>,
}

impl ServiceDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    /// Register a service under its own name, replacing any previous
    /// registration.
    pub fn register(&self, service: ServiceHandle) {
        let name = service.name().to_string();
        debug!("[Directory] Registering service `{name}`");
        if self
            .services
            .write()
            .insert(name.clone(), service)
            .is_some()
        {
            warn!("[Directory] Service `{name}` was already registered, replaced");
        }
    }

    /// Resolve a service by name.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnknownService`] when nothing is registered under
    /// the name.
    pub fn resolve(&self, name: &str) -> Result<ServiceHandle, ServiceError> {
        self.services
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownService {
                name: name.to_string(),
            })
    }

    /// Whether a service is registered under the name.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    /// Registered service names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl Default for ServiceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor;

    struct StampService {
        name: &'static str,
        stamp: &'static str,
    }

    impl BusService for StampService {
        fn name(&self) -> &str {
            self.name
        }

        fn handle(&self, operation: &str, envelope: &mut Envelope) -> Result<(), ServiceError> {
            match operation {
                "stamp" => {
                    envelope.set_header("X-Stamped-By", self.stamp);
                    Ok(())
                }
                "fail" => Err(ServiceError::Failed {
                    service: self.name.to_string(),
                    message: "stamp pad is dry".to_string(),
                }),
                other => Err(ServiceError::UnsupportedOperation {
                    service: self.name.to_string(),
                    operation: other.to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let directory = ServiceDirectory::new();
        directory.register(Arc::new(StampService {
            name: "notary",
            stamp: "n-1",
        }));

        assert!(directory.is_registered("notary"));
        assert_eq!(directory.len(), 1);
        let service = directory.resolve("notary").unwrap();
        assert_eq!(service.name(), "notary");
    }

    #[test]
    fn test_resolve_unknown_is_an_error() {
        let directory = ServiceDirectory::new();
        assert!(matches!(
            directory.resolve("ghost"),
            Err(ServiceError::UnknownService { name }) if name == "ghost"
        ));
    }

    #[test]
    fn test_reregistering_replaces() {
        let directory = ServiceDirectory::new();
        directory.register(Arc::new(StampService {
            name: "notary",
            stamp: "n-1",
        }));
        directory.register(Arc::new(StampService {
            name: "notary",
            stamp: "n-2",
        }));
        assert_eq!(directory.len(), 1);

        let mut envelope = Envelope::headers_only();
        directory
            .resolve("notary")
            .unwrap()
            .handle("stamp", &mut envelope)
            .unwrap();
        assert_eq!(envelope.header("X-Stamped-By").as_deref(), Some("n-2"));
    }

    #[test]
    fn test_names_are_sorted() {
        let directory = ServiceDirectory::new();
        for name in ["tor", "email", "keyring"] {
            directory.register(Arc::new(StampService { name, stamp: "s" }));
        }
        assert_eq!(directory.names(), ["email", "keyring", "tor"]);
    }

    #[test]
    fn test_handler_outcome_travels_on_the_envelope() {
        let directory = ServiceDirectory::new();
        directory.register(Arc::new(StampService {
            name: "notary",
            stamp: "n-1",
        }));

        let mut envelope = Envelope::document();
        let service = directory.resolve("notary").unwrap();
        if let Err(e) = service.handle("fail", &mut envelope) {
            accessor::add_exception(&envelope, e);
        }
        let reports = accessor::exceptions(&envelope);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("stamp pad is dry"));
    }

    #[test]
    fn test_error_display_names_the_parties() {
        let err = ServiceError::UnsupportedOperation {
            service: "keyring".to_string(),
            operation: "teleport".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("keyring"));
        assert!(display.contains("teleport"));
    }
}
