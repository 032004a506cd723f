//! # Sample Services
//!
//! Minimal services the simulated bus registers: enough behavior to push
//! real work through the kernel (identity hashing, transport selection,
//! content storage with a mid-flight route append, notification counting)
//! without becoming services worth shipping.

use bus_crypto::HasherRegistry;
use bus_types::accessor;
use bus_types::{BusService, Envelope, Sensitivity, ServiceError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Weakest transport a relay may pick for a sensitivity tier.
pub fn transport_for(sensitivity: Sensitivity) -> &'static str {
    match sensitivity {
        Sensitivity::None => "http",
        Sensitivity::Low => "https",
        Sensitivity::Medium => "tor",
        Sensitivity::High => "i2p",
        Sensitivity::VeryHigh => "i2p-delayed",
        Sensitivity::Extreme => "mesh",
        Sensitivity::Neo => "mesh-i2p-delayed",
    }
}

// =============================================================================
// KEYRING - identity hashing and authentication
// =============================================================================

/// Hashes and authenticates the passphrase on an envelope's identity.
///
/// Operations: `hash` packs the identity's passphrase into an encoded
/// hash under its declared algorithm; `authenticate` checks the
/// passphrase against the stored hash and flips the authenticated flag
/// either way.
pub struct KeyringService {
    hashers: Arc<HasherRegistry>,
}

impl KeyringService {
    /// Create a keyring resolving strategies from `hashers`.
    pub fn new(hashers: Arc<HasherRegistry>) -> Self {
        Self { hashers }
    }

    fn failed(&self, message: impl Into<String>) -> ServiceError {
        ServiceError::Failed {
            service: self.name().to_string(),
            message: message.into(),
        }
    }
}

impl BusService for KeyringService {
    fn name(&self) -> &str {
        "keyring"
    }

    fn handle(&self, operation: &str, envelope: &mut Envelope) -> Result<(), ServiceError> {
        match operation {
            "hash" => {
                let did = envelope.did();
                let mut did = did.write();
                let passphrase = did
                    .passphrase()
                    .map(str::to_string)
                    .ok_or_else(|| self.failed("no passphrase to hash"))?;
                let hasher = self
                    .hashers
                    .resolve(did.passphrase_hash_algorithm())
                    .map_err(|e| self.failed(e.to_string()))?;
                let encoded = hasher
                    .hash(&passphrase)
                    .map_err(|e| self.failed(e.to_string()))?;
                did.set_passphrase_hash(encoded);
                Ok(())
            }
            "authenticate" => {
                let did = envelope.did();
                let did = did.read();
                let passphrase = did
                    .passphrase()
                    .ok_or_else(|| self.failed("no passphrase to check"))?;
                let stored = did
                    .passphrase_hash()
                    .ok_or_else(|| self.failed("identity carries no passphrase hash"))?;
                let hasher = self
                    .hashers
                    .resolve(did.passphrase_hash_algorithm())
                    .map_err(|e| self.failed(e.to_string()))?;
                let authenticated = hasher
                    .verify(passphrase, stored)
                    .map_err(|e| self.failed(e.to_string()))?;
                did.set_authenticated(authenticated);
                Ok(())
            }
            other => Err(ServiceError::UnsupportedOperation {
                service: self.name().to_string(),
                operation: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// RELAY - sensitivity-steered transport selection
// =============================================================================

/// Picks a transport for the envelope's sensitivity tier.
///
/// Operations: `forward` records the chosen transport in the
/// `X-Transport` header; `escalate` raises the tier to at least
/// [`Sensitivity::Medium`], never lowering it.
pub struct RelayService;

impl BusService for RelayService {
    fn name(&self) -> &str {
        "relay"
    }

    fn handle(&self, operation: &str, envelope: &mut Envelope) -> Result<(), ServiceError> {
        match operation {
            "forward" => {
                envelope.set_header("X-Transport", transport_for(envelope.sensitivity()));
                Ok(())
            }
            "escalate" => {
                let raised = envelope.sensitivity().max(Sensitivity::Medium);
                envelope.set_sensitivity(raised);
                Ok(())
            }
            other => Err(ServiceError::UnsupportedOperation {
                service: self.name().to_string(),
                operation: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// STORAGE - content store keyed by envelope id
// =============================================================================

/// Stores the staged content of document envelopes.
///
/// Operations: `store` keeps the `CONTENT` slot under the envelope's
/// identifier and appends a `notify`/`announce` hop to the itinerary;
/// `load` stages stored content back onto the envelope.
pub struct StorageService {
    contents: RwLock<HashMap<i64, Value>>,
}

impl StorageService {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            contents: RwLock::new(HashMap::new()),
        }
    }

    /// Content stored under an envelope identifier.
    pub fn stored(&self, id: i64) -> Option<Value> {
        self.contents.read().get(&id).cloned()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.contents.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.contents.read().is_empty()
    }
}

impl Default for StorageService {
    fn default() -> Self {
        Self::new()
    }
}

impl BusService for StorageService {
    fn name(&self) -> &str {
        "storage"
    }

    fn handle(&self, operation: &str, envelope: &mut Envelope) -> Result<(), ServiceError> {
        match operation {
            "store" => {
                let content = accessor::content(envelope).ok_or_else(|| ServiceError::Failed {
                    service: self.name().to_string(),
                    message: "nothing staged to store".to_string(),
                })?;
                self.contents.write().insert(envelope.id(), content);
                envelope.add_route("notify", "announce");
                Ok(())
            }
            "load" => {
                let content =
                    self.stored(envelope.id())
                        .ok_or_else(|| ServiceError::Failed {
                            service: self.name().to_string(),
                            message: format!("nothing stored under {}", envelope.id()),
                        })?;
                accessor::add_content(envelope, content);
                Ok(())
            }
            other => Err(ServiceError::UnsupportedOperation {
                service: self.name().to_string(),
                operation: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// NOTIFY - announcement counter
// =============================================================================

/// Counts announcements. Stands in for a subscriber-facing service.
pub struct NotifyService {
    announcements: AtomicU64,
}

impl NotifyService {
    /// Create with a zeroed counter.
    pub fn new() -> Self {
        Self {
            announcements: AtomicU64::new(0),
        }
    }

    /// Announcements handled so far.
    pub fn announcements(&self) -> u64 {
        self.announcements.load(Ordering::SeqCst)
    }
}

impl Default for NotifyService {
    fn default() -> Self {
        Self::new()
    }
}

impl BusService for NotifyService {
    fn name(&self) -> &str {
        "notify"
    }

    fn handle(&self, operation: &str, _envelope: &mut Envelope) -> Result<(), ServiceError> {
        match operation {
            "announce" => {
                self.announcements.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            other => Err(ServiceError::UnsupportedOperation {
                service: self.name().to_string(),
                operation: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transports_are_distinct_per_tier() {
        use Sensitivity::*;
        let tiers = [None, Low, Medium, High, VeryHigh, Extreme, Neo];
        let transports: Vec<&str> = tiers.iter().map(|t| transport_for(*t)).collect();
        for (i, a) in transports.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &transports[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_storage_load_restages_content() {
        let storage = StorageService::new();
        let mut envelope = Envelope::document_with_id(7);
        accessor::add_content(&envelope, "kept");
        storage.handle("store", &mut envelope).unwrap();

        let mut fetch = Envelope::document_with_id(7);
        storage.handle("load", &mut fetch).unwrap();
        assert_eq!(accessor::content(&fetch), Some(Value::from("kept")));
    }

    #[test]
    fn test_storage_load_misses_are_errors() {
        let storage = StorageService::new();
        let mut envelope = Envelope::document_with_id(404);
        assert!(matches!(
            storage.handle("load", &mut envelope),
            Err(ServiceError::Failed { .. })
        ));
    }

    #[test]
    fn test_keyring_refuses_hash_without_passphrase() {
        let keyring = KeyringService::new(Arc::new(HasherRegistry::with_defaults()));
        let mut envelope = Envelope::headers_only();
        assert!(matches!(
            keyring.handle("hash", &mut envelope),
            Err(ServiceError::Failed { .. })
        ));
    }
}
