//! # Runtime Simulation Tests
//!
//! End-to-end tests that push envelopes through a minimal dispatch loop
//! wired with the sample services. The loop exists to exercise the kernel
//! types; queueing, threading, and retry policy of a real dispatcher are
//! out of scope.
//!
//! ## Test Categories
//!
//! 1. **Full Pipeline**: store → relay → notify, with a hop appended mid-flight
//! 2. **Degradation**: unknown services and refused operations land on the envelope, never abort the itinerary
//! 3. **Identity**: passphrase hashed and authenticated through the strategy registry
//! 4. **Wire Resume**: an envelope serialized between hops resumes where it left off
//! 5. **Concurrency**: trust flags flipped from many threads at once

use crate::services::{KeyringService, NotifyService, RelayService, StorageService};
use bus_crypto::HasherRegistry;
use bus_types::accessor;
use bus_types::{
    CounterIdSource, Envelope, EnvelopeFactory, ServiceDirectory, WireRegistry,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// SIMULATED BUS
// =============================================================================

/// A bus with the sample services registered and a hop-by-hop dispatch
/// loop. Identifiers are drawn from a counter so tests are deterministic.
pub struct SimulatedBus {
    directory: Arc<ServiceDirectory>,
    factory: EnvelopeFactory,
    registry: WireRegistry,
    storage: Arc<StorageService>,
    notify: Arc<NotifyService>,
    hops_dispatched: AtomicU64,
}

impl SimulatedBus {
    /// Wire up the directory with the sample services.
    pub fn new() -> Self {
        let directory = Arc::new(ServiceDirectory::new());
        let storage = Arc::new(StorageService::new());
        let notify = Arc::new(NotifyService::new());

        directory.register(Arc::new(KeyringService::new(Arc::new(
            HasherRegistry::with_defaults(),
        ))));
        directory.register(Arc::new(RelayService));
        directory.register(storage.clone());
        directory.register(notify.clone());

        Self {
            directory,
            factory: EnvelopeFactory::new(Arc::new(CounterIdSource::new())),
            registry: WireRegistry::with_defaults(),
            storage,
            notify,
            hops_dispatched: AtomicU64::new(0),
        }
    }

    /// The factory envelopes for this bus are drawn from.
    pub fn factory(&self) -> &EnvelopeFactory {
        &self.factory
    }

    /// The registry envelopes off the wire are rebuilt through.
    pub fn registry(&self) -> &WireRegistry {
        &self.registry
    }

    /// The service directory.
    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    /// The storage service, for inspecting stored content.
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    /// The notify service, for inspecting announcement counts.
    pub fn notify(&self) -> &NotifyService {
        &self.notify
    }

    /// Hops dispatched since construction.
    pub fn hops_dispatched(&self) -> u64 {
        self.hops_dispatched.load(Ordering::SeqCst)
    }

    /// Advance the envelope one hop. Resolution and handler failures are
    /// recorded on the envelope; the hop is marked routed either way.
    /// `false` once the itinerary is exhausted.
    pub fn dispatch_one(&self, envelope: &mut Envelope) -> bool {
        let Some(route) = envelope.next_route() else {
            return false;
        };
        self.hops_dispatched.fetch_add(1, Ordering::SeqCst);

        match self.directory.resolve(route.service()) {
            Ok(service) => {
                if let Err(e) = service.handle(route.operation(), envelope) {
                    accessor::add_exception(envelope, e);
                }
            }
            Err(e) => {
                accessor::add_exception(envelope, e);
            }
        }
        route.set_routed(true);
        true
    }

    /// Dispatch until the itinerary is exhausted, hops appended
    /// mid-flight included. Returns the hops taken this call.
    pub fn dispatch(&self, envelope: &mut Envelope) -> u64 {
        let mut hops = 0;
        while self.dispatch_one(envelope) {
            hops += 1;
        }
        hops
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}
