//! # Strategy Registry
//!
//! Resolves passphrase-hash strategies by the algorithm name identities
//! carry. Wire the registry once at startup, then resolve per identity.

use crate::errors::HashError;
use crate::hashing::{PassphraseHasher, Pbkdf2HmacSha1, Pbkdf2HmacSha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a registered strategy.
pub type HasherHandle = Arc<dyn PassphraseHasher>;

/// Algorithm-name registry of passphrase-hash strategies.
pub struct HasherRegistry {
    hashers: HashMap<&'static str, HasherHandle>,
}

impl HasherRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hashers: HashMap::new(),
        }
    }

    /// Registry pre-loaded with both PBKDF2 strategies at their default
    /// iteration counts.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Pbkdf2HmacSha1::new()));
        registry.register(Arc::new(Pbkdf2HmacSha256::new()));
        registry
    }

    /// Register a strategy under its own name, replacing any previous
    /// registration.
    pub fn register(&mut self, hasher: HasherHandle) {
        self.hashers.insert(hasher.name(), hasher);
    }

    /// Resolve a strategy by algorithm name.
    ///
    /// # Errors
    ///
    /// [`HashError::UnknownAlgorithm`] when nothing is registered under
    /// the name.
    pub fn resolve(&self, name: &str) -> Result<HasherHandle, HashError> {
        self.hashers
            .get(name)
            .cloned()
            .ok_or_else(|| HashError::UnknownAlgorithm {
                name: name.to_string(),
            })
    }

    /// Registered algorithm names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.hashers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_strategies() {
        let registry = HasherRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            ["PBKDF2WithHmacSHA1", "PBKDF2WithHmacSHA256"]
        );
    }

    #[test]
    fn test_resolve_unknown_is_an_error() {
        let registry = HasherRegistry::with_defaults();
        assert!(matches!(
            registry.resolve("Argon2id"),
            Err(HashError::UnknownAlgorithm { name }) if name == "Argon2id"
        ));
    }

    #[test]
    fn test_resolved_strategy_round_trips() {
        let mut registry = HasherRegistry::new();
        registry.register(Arc::new(Pbkdf2HmacSha1::with_iterations(8)));

        let hasher = registry.resolve("PBKDF2WithHmacSHA1").unwrap();
        let encoded = hasher.hash("resolved and used").unwrap();
        assert!(hasher.verify("resolved and used", &encoded).unwrap());
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut registry = HasherRegistry::with_defaults();
        registry.register(Arc::new(Pbkdf2HmacSha1::with_iterations(8)));
        assert_eq!(registry.names().len(), 2);

        // The cheap replacement is the one resolved now.
        let hasher = registry.resolve("PBKDF2WithHmacSHA1").unwrap();
        let encoded = hasher.hash("replaced").unwrap();
        assert!(encoded.starts_with("pbkdf2-sha1$8$"));
    }
}
