//! # Decentralized Identity
//!
//! A [`Did`] is the identity an envelope travels under: an alias, a
//! passphrase hash (the identity's one comparable credential), a status,
//! two trust flags, and the identity's known public keys and peers.
//!
//! ## Trust Flags
//!
//! `verified` and `authenticated` are the only fields with a concurrent
//! access contract: verification and authentication services flip them
//! from their own threads while the envelope is elsewhere in flight. They
//! are atomics settable through a shared reference; everything else on the
//! identity follows normal ownership.
//!
//! ## Passphrase Hygiene
//!
//! The plaintext passphrase is write-only transient state: it never
//! appears in the canonical map and its buffer is scrubbed on drop. Only
//! the hash travels.

use crate::wire::{self, MapForm, WireMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;
use zeroize::Zeroizing;

/// Lifecycle status of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DidStatus {
    /// Known but not usable.
    Inactive,
    /// Usable.
    Active,
    /// Administratively blocked.
    Suspended,
}

impl DidStatus {
    /// Canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DidStatus::Inactive => "INACTIVE",
            DidStatus::Active => "ACTIVE",
            DidStatus::Suspended => "SUSPENDED",
        }
    }

    /// Resolve a canonical wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "INACTIVE" => Some(DidStatus::Inactive),
            "ACTIVE" => Some(DidStatus::Active),
            "SUSPENDED" => Some(DidStatus::Suspended),
            _ => None,
        }
    }
}

/// A public key the identity answers to, keyed by alias in
/// [`Did::identities`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    /// Key algorithm name, e.g. `ElGamal-2048`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    /// Encoding format name, e.g. `X.509`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Key material, base64 text.
    #[serde(rename = "encodedInBase64", skip_serializing_if = "Option::is_none")]
    pub encoded: Option<String>,
}

impl PublicKeyRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: None,
            format: None,
            encoded: None,
        }
    }

    /// Decode the key material.
    ///
    /// # Errors
    ///
    /// [`wire::WireError::MissingField`] when no material is present, or
    /// [`wire::WireError::InvalidBase64`] when it does not decode.
    pub fn decode_key(&self) -> Result<Vec<u8>, wire::WireError> {
        let encoded = self.encoded.as_deref().ok_or(wire::WireError::MissingField {
            field: "encodedInBase64",
        })?;
        wire::decode_base64("encodedInBase64", encoded)
    }
}

impl Default for PublicKeyRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// A peer of this identity on some network, keyed by network name in
/// [`Did::peers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Network the peer is reachable on, e.g. `Tor`, `I2P`.
    pub network: String,

    /// Network-specific address text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Key fingerprint on that network, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl Peer {
    /// Create a peer on `network` with no address yet.
    #[must_use]
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address: None,
            fingerprint: None,
        }
    }

    /// Create a peer with an address.
    #[must_use]
    pub fn with_address(network: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address: Some(address.into()),
            fingerprint: None,
        }
    }
}

// ==============================================================================
// The identity itself
// ==============================================================================

/// Decentralized identity attached to an envelope.
pub struct Did {
    /// Human-facing alias.
    alias: Option<String>,
    /// Plaintext passphrase. Write-only: never serialized, scrubbed on
    /// drop.
    passphrase: Option<Zeroizing<String>>,
    /// Encoded passphrase hash. The identity's sole comparable credential.
    passphrase_hash: Option<String>,
    /// Name of the algorithm that produced the hash.
    passphrase_hash_algorithm: String,
    /// Free-form description.
    description: String,
    /// Lifecycle status.
    status: DidStatus,
    /// Set once an identity-verification service vouched for this DID.
    verified: AtomicBool,
    /// Set once the passphrase was checked this session.
    authenticated: AtomicBool,
    /// Public keys by alias.
    identities: HashMap<String, PublicKeyRecord>,
    /// Peers by network name.
    peers: HashMap<String, Peer>,
}

impl Did {
    /// Algorithm name assumed for passphrase hashes until told otherwise.
    pub const DEFAULT_HASH_ALGORITHM: &'static str = "PBKDF2WithHmacSHA1";

    /// Create a blank, active identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alias: None,
            passphrase: None,
            passphrase_hash: None,
            passphrase_hash_algorithm: Self::DEFAULT_HASH_ALGORITHM.to_string(),
            description: String::new(),
            status: DidStatus::Active,
            verified: AtomicBool::new(false),
            authenticated: AtomicBool::new(false),
            identities: HashMap::new(),
            peers: HashMap::new(),
        }
    }

    /// The alias, when set.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Set the alias.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = Some(alias.into());
    }

    /// The plaintext passphrase, when held. Feed it to a hasher, never to
    /// the wire.
    #[must_use]
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().map(String::as_str)
    }

    /// Hold a plaintext passphrase. The buffer is scrubbed when replaced
    /// or dropped.
    pub fn set_passphrase(&mut self, passphrase: impl Into<String>) {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
    }

    /// Drop the plaintext passphrase, scrubbing its buffer.
    pub fn clear_passphrase(&mut self) {
        self.passphrase = None;
    }

    /// The encoded passphrase hash, when set.
    #[must_use]
    pub fn passphrase_hash(&self) -> Option<&str> {
        self.passphrase_hash.as_deref()
    }

    /// Set the encoded passphrase hash.
    pub fn set_passphrase_hash(&mut self, hash: impl Into<String>) {
        self.passphrase_hash = Some(hash.into());
    }

    /// Name of the algorithm that produced the hash.
    #[must_use]
    pub fn passphrase_hash_algorithm(&self) -> &str {
        &self.passphrase_hash_algorithm
    }

    /// Record which algorithm produced the hash.
    pub fn set_passphrase_hash_algorithm(&mut self, name: impl Into<String>) {
        self.passphrase_hash_algorithm = name.into();
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> DidStatus {
        self.status
    }

    /// Set the lifecycle status.
    pub fn set_status(&mut self, status: DidStatus) {
        self.status = status;
    }

    /// Whether an identity-verification service vouched for this DID.
    #[must_use]
    pub fn verified(&self) -> bool {
        self.verified.load(Ordering::Relaxed)
    }

    /// Flip the verified flag. Callable through a shared reference; this
    /// is one of the two fields services touch concurrently.
    pub fn set_verified(&self, verified: bool) {
        self.verified.store(verified, Ordering::Relaxed);
    }

    /// Whether the passphrase was checked this session.
    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    /// Flip the authenticated flag. Same contract as
    /// [`Did::set_verified`].
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Relaxed);
    }

    /// Record a public key under an alias. Replaces any previous record
    /// under that alias.
    pub fn add_identity(&mut self, alias: impl Into<String>, record: PublicKeyRecord) {
        self.identities.insert(alias.into(), record);
    }

    /// Look up a public key by alias.
    #[must_use]
    pub fn identity(&self, alias: &str) -> Option<&PublicKeyRecord> {
        self.identities.get(alias)
    }

    /// All known public keys by alias.
    #[must_use]
    pub fn identities(&self) -> &HashMap<String, PublicKeyRecord> {
        &self.identities
    }

    /// Record a peer, keyed by its network name. Replaces any previous
    /// peer on that network.
    pub fn add_peer(&mut self, peer: Peer) {
        self.peers.insert(peer.network.clone(), peer);
    }

    /// Look up the peer on a network.
    #[must_use]
    pub fn peer(&self, network: &str) -> Option<&Peer> {
        self.peers.get(network)
    }

    /// All known peers by network name.
    #[must_use]
    pub fn peers(&self) -> &HashMap<String, Peer> {
        &self.peers
    }

    /// Rebuild from the canonical map. Forgiving: a malformed nested
    /// entry or unknown status name is reported and dropped while the
    /// rest of the identity hydrates. The passphrase is never on the
    /// wire, so a rehydrated identity never holds one.
    #[must_use]
    pub fn from_map(map: &WireMap) -> Self {
        let mut did = Did::new();
        did.alias = wire::get_str(map, "alias");
        did.passphrase_hash = wire::get_str(map, "passphraseHash");
        if let Some(algorithm) = wire::get_str(map, "passphraseHashAlgorithm") {
            did.passphrase_hash_algorithm = algorithm;
        }
        if let Some(description) = wire::get_str(map, "description") {
            did.description = description;
        }
        if let Some(name) = wire::get_str(map, "status") {
            match DidStatus::from_name(&name) {
                Some(status) => did.status = status,
                None => warn!("[Did] Unknown status name `{name}`, keeping ACTIVE"),
            }
        }
        did.set_verified(wire::get_bool(map, "verified").unwrap_or(false));
        did.set_authenticated(wire::get_bool(map, "authenticated").unwrap_or(false));

        if let Some(identities) = wire::get_map(map, "identities") {
            for (alias, value) in identities {
                match serde_json::from_value::<PublicKeyRecord>(value.clone()) {
                    Ok(record) => {
                        did.identities.insert(alias.clone(), record);
                    }
                    Err(e) => warn!("[Did] Dropping malformed identity `{alias}`: {e}"),
                }
            }
        }
        if let Some(peers) = wire::get_map(map, "peers") {
            for (network, value) in peers {
                match serde_json::from_value::<Peer>(value.clone()) {
                    Ok(peer) => did.add_peer(peer),
                    Err(e) => warn!("[Did] Dropping malformed peer `{network}`: {e}"),
                }
            }
        }
        did
    }
}

impl Default for Did {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Did {
    fn clone(&self) -> Self {
        Self {
            alias: self.alias.clone(),
            passphrase: self.passphrase.clone(),
            passphrase_hash: self.passphrase_hash.clone(),
            passphrase_hash_algorithm: self.passphrase_hash_algorithm.clone(),
            description: self.description.clone(),
            status: self.status,
            verified: AtomicBool::new(self.verified()),
            authenticated: AtomicBool::new(self.authenticated()),
            identities: self.identities.clone(),
            peers: self.peers.clone(),
        }
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Did")
            .field("alias", &self.alias)
            .field("passphrase_hash", &self.passphrase_hash)
            .field("status", &self.status)
            .field("verified", &self.verified())
            .field("authenticated", &self.authenticated())
            .finish()
    }
}

/// Identity equality is credential equality: both hashes present and
/// equal. A DID without a hash equals nothing, itself included, so `Eq`
/// is deliberately not implemented.
impl PartialEq for Did {
    fn eq(&self, other: &Self) -> bool {
        match (&self.passphrase_hash, &other.passphrase_hash) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Hash for Did {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.passphrase_hash {
            Some(h) => h.hash(state),
            None => 0i32.hash(state),
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.passphrase_hash.as_deref().unwrap_or_default())
    }
}

impl MapForm for Did {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        if let Some(alias) = &self.alias {
            map.insert("alias".into(), Value::from(alias.clone()));
        }
        // The plaintext passphrase is write-only; only the hash travels.
        if let Some(hash) = &self.passphrase_hash {
            map.insert("passphraseHash".into(), Value::from(hash.clone()));
        }
        map.insert(
            "passphraseHashAlgorithm".into(),
            Value::from(self.passphrase_hash_algorithm.clone()),
        );
        map.insert("description".into(), Value::from(self.description.clone()));
        map.insert("status".into(), Value::from(self.status.as_str()));
        map.insert("verified".into(), Value::from(self.verified()));
        map.insert("authenticated".into(), Value::from(self.authenticated()));

        if !self.identities.is_empty() {
            let mut identities = WireMap::new();
            for (alias, record) in &self.identities {
                if let Ok(value) = serde_json::to_value(record) {
                    identities.insert(alias.clone(), value);
                }
            }
            map.insert("identities".into(), Value::Object(identities));
        }
        if !self.peers.is_empty() {
            let mut peers = WireMap::new();
            for (network, peer) in &self.peers {
                if let Ok(value) = serde_json::to_value(peer) {
                    peers.insert(network.clone(), value);
                }
            }
            map.insert("peers".into(), Value::Object(peers));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let did = Did::new();
        assert_eq!(did.status(), DidStatus::Active);
        assert_eq!(
            did.passphrase_hash_algorithm(),
            Did::DEFAULT_HASH_ALGORITHM
        );
        assert_eq!(did.description(), "");
        assert!(!did.verified());
        assert!(!did.authenticated());
        assert!(did.passphrase().is_none());
        assert!(did.passphrase_hash().is_none());
    }

    #[test]
    fn test_equality_is_credential_equality() {
        let mut a = Did::new();
        let mut b = Did::new();

        // No credential on either side: equal to nothing, itself included.
        assert!(a != b);
        assert!(a != a.clone());

        a.set_passphrase_hash("h1");
        assert!(a != b);

        b.set_passphrase_hash("h1");
        b.set_alias("completely different alias");
        assert!(a == b);

        b.set_passphrase_hash("h2");
        assert!(a != b);
    }

    #[test]
    fn test_passphrase_never_reaches_the_wire() {
        let mut did = Did::new();
        did.set_alias("anna");
        did.set_passphrase("correct horse battery staple");
        did.set_passphrase_hash("pbkdf2-sha1$2048$c2FsdA$aGFzaA");

        let map = did.to_map();
        let json = serde_json::Value::Object(map.clone()).to_string();
        assert!(!json.contains("correct horse battery staple"));
        assert!(map.get("passphrase").is_none());

        let back = Did::from_map(&map);
        assert!(back.passphrase().is_none());
        assert_eq!(back.passphrase_hash(), did.passphrase_hash());
        assert_eq!(back.alias(), Some("anna"));
    }

    #[test]
    fn test_round_trip_preserves_identities_and_peers() {
        let mut did = Did::new();
        did.set_alias("anna");
        did.set_description("field agent");
        did.set_status(DidStatus::Suspended);
        did.set_verified(true);
        did.add_identity(
            "anna@mail",
            PublicKeyRecord {
                algorithm: Some("ElGamal-2048".into()),
                format: Some("X.509".into()),
                encoded: Some(wire::encode_base64(b"key-bytes")),
            },
        );
        did.add_peer(Peer::with_address("Tor", "abcdefgh.onion"));
        did.add_peer(Peer::new("I2P"));

        let back = Did::from_map(&did.to_map());
        assert_eq!(back.alias(), Some("anna"));
        assert_eq!(back.description(), "field agent");
        assert_eq!(back.status(), DidStatus::Suspended);
        assert!(back.verified());
        assert!(!back.authenticated());
        assert_eq!(back.identities().len(), 1);
        assert_eq!(
            back.identity("anna@mail").unwrap().algorithm.as_deref(),
            Some("ElGamal-2048")
        );
        assert_eq!(
            back.peer("Tor").unwrap().address.as_deref(),
            Some("abcdefgh.onion")
        );
        assert!(back.peer("I2P").is_some());
        assert!(back.peer("Bluetooth").is_none());
    }

    #[test]
    fn test_canonical_did_field_names() {
        let mut did = Did::new();
        did.set_alias("anna");
        did.set_passphrase_hash("pbkdf2-sha1$2048$c2FsdA$aGFzaA");
        did.set_description("field agent");
        did.set_verified(true);
        did.add_identity(
            "anna@mail",
            PublicKeyRecord {
                algorithm: Some("ElGamal-2048".into()),
                format: Some("X.509".into()),
                encoded: Some(wire::encode_base64(b"key-bytes")),
            },
        );
        did.add_peer(Peer::new("Tor"));

        let map = did.to_map();
        for field in [
            "alias",
            "passphraseHash",
            "passphraseHashAlgorithm",
            "description",
            "status",
            "verified",
            "authenticated",
            "identities",
            "peers",
        ] {
            assert!(map.contains_key(field), "missing canonical field {field}");
        }

        let identities = map["identities"].as_object().unwrap();
        let record = identities["anna@mail"].as_object().unwrap();
        for field in ["algorithm", "format", "encodedInBase64"] {
            assert!(record.contains_key(field), "missing record field {field}");
        }
        assert!(map["peers"].as_object().unwrap().contains_key("Tor"));
    }

    #[test]
    fn test_unknown_status_keeps_default() {
        let mut map = Did::new().to_map();
        map.insert("status".into(), Value::from("ASCENDED"));
        let did = Did::from_map(&map);
        assert_eq!(did.status(), DidStatus::Active);
    }

    #[test]
    fn test_add_peer_replaces_same_network() {
        let mut did = Did::new();
        did.add_peer(Peer::with_address("Tor", "old.onion"));
        did.add_peer(Peer::with_address("Tor", "new.onion"));
        assert_eq!(did.peers().len(), 1);
        assert_eq!(did.peer("Tor").unwrap().address.as_deref(), Some("new.onion"));
    }

    #[test]
    fn test_trust_flags_flip_through_shared_references() {
        let did = Did::new();
        std::thread::scope(|scope| {
            scope.spawn(|| did.set_verified(true));
            scope.spawn(|| did.set_authenticated(true));
        });
        assert!(did.verified());
        assert!(did.authenticated());
    }

    #[test]
    fn test_display_renders_the_hash() {
        let mut did = Did::new();
        assert_eq!(did.to_string(), "");
        did.set_passphrase_hash("h1");
        assert_eq!(did.to_string(), "h1");
    }

    #[test]
    fn test_malformed_identity_entry_is_dropped() {
        let mut did = Did::new();
        did.add_identity("good", PublicKeyRecord::new());
        let mut map = did.to_map();
        if let Some(Value::Object(identities)) = map.get_mut("identities") {
            identities.insert("bad".into(), Value::from(42));
        }

        let back = Did::from_map(&map);
        assert_eq!(back.identities().len(), 1);
        assert!(back.identity("good").is_some());
    }

    #[test]
    fn test_key_material_decodes() {
        let record = PublicKeyRecord {
            algorithm: None,
            format: None,
            encoded: Some(wire::encode_base64(b"\x01\x02\x03")),
        };
        assert_eq!(record.decode_key().unwrap(), vec![1, 2, 3]);
        assert!(PublicKeyRecord::new().decode_key().is_err());
    }
}
