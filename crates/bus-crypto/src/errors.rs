//! Passphrase-hash error types.

use thiserror::Error;

/// Passphrase-hash operation errors.
#[derive(Debug, Error)]
pub enum HashError {
    /// An encoded hash string does not parse as `tag$iterations$salt$hash`.
    #[error("Malformed passphrase hash: {0}")]
    MalformedEncoding(String),

    /// An encoded hash string was produced by a different strategy.
    #[error("Algorithm mismatch: expected `{expected}`, found `{found}`")]
    AlgorithmMismatch {
        /// Tag the verifying strategy packs with.
        expected: &'static str,
        /// Tag found in the encoded string.
        found: String,
    },

    /// No strategy is registered under the requested algorithm name.
    #[error("No passphrase-hash strategy registered under `{name}`")]
    UnknownAlgorithm {
        /// The name that resolved to nothing.
        name: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    Derivation(String),
}
