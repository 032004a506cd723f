//! # Bus Crypto - Passphrase-Hash Strategies
//!
//! Hashing strategies for the passphrase credentials bus identities
//! carry. An identity stores only the encoded hash and the algorithm
//! name; this crate turns passphrases into encoded hashes and checks
//! passphrases against them.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | PBKDF2-HMAC-SHA1 | Identity default (`PBKDF2WithHmacSHA1`) |
//! | `hashing` | PBKDF2-HMAC-SHA256 | Stronger PRF, same packed encoding |
//! | `registry` | - | Algorithm-name to strategy resolution |
//!
//! ## Properties
//!
//! - **Self-describing hashes**: iterations and salt travel inside the
//!   encoded string, so defaults can change without invalidating stored
//!   hashes
//! - **Fresh salt per hash**: equal passphrases never produce equal
//!   encoded strings
//! - **Constant-time comparison**: verification does not leak match
//!   prefixes through timing
//! - **Wiped key material**: derived buffers are zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod registry;

// Re-exports
pub use errors::HashError;
pub use hashing::{
    DerivedKey, PassphraseHasher, Pbkdf2HmacSha1, Pbkdf2HmacSha256, DEFAULT_ITERATIONS, SALT_LEN,
};
pub use registry::{HasherHandle, HasherRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
