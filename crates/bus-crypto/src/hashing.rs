//! # PBKDF2 Passphrase-Hash Strategies
//!
//! Strategies that turn a passphrase into a self-describing encoded hash
//! string, and check a passphrase against one. The encoded form is
//!
//! ```text
//! tag$iterations$salt$hash
//! ```
//!
//! with salt and hash in unpadded standard base64. Iterations and salt
//! travel inside the string, so verification never depends on the
//! verifying instance's own parameters and old hashes survive a change
//! of defaults.

use crate::errors::HashError;
use base64::Engine;
use hmac::Hmac;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// PBKDF2 iteration count used when hashing new passphrases.
pub const DEFAULT_ITERATIONS: u32 = 65_536;

/// Bytes of random salt drawn per hash.
pub const SALT_LEN: usize = 16;

/// Raw key material derived from a passphrase. Wiped on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    /// Wrap derived bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get inner bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contract every passphrase-hash strategy implements.
///
/// `name()` is the algorithm identifier identities carry in their
/// `passphraseHashAlgorithm` field; the registry resolves strategies
/// by it.
pub trait PassphraseHasher: Send + Sync {
    /// Algorithm name identities reference.
    fn name(&self) -> &'static str;

    /// Hash a passphrase under a fresh random salt.
    ///
    /// # Errors
    ///
    /// [`HashError::Derivation`] when key derivation fails.
    fn hash(&self, passphrase: &str) -> Result<String, HashError>;

    /// Check a passphrase against an encoded hash produced by this
    /// strategy.
    ///
    /// # Errors
    ///
    /// [`HashError::MalformedEncoding`] or [`HashError::AlgorithmMismatch`]
    /// when the encoded string is not this strategy's, and
    /// [`HashError::Derivation`] when re-derivation fails. A wrong
    /// passphrase is `Ok(false)`, not an error.
    fn verify(&self, passphrase: &str, encoded: &str) -> Result<bool, HashError>;
}

// =============================================================================
// PBKDF2-HMAC-SHA1
// =============================================================================

/// PBKDF2 over HMAC-SHA1, the default strategy for bus identities.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2HmacSha1 {
    iterations: u32,
}

impl Pbkdf2HmacSha1 {
    /// Algorithm name identities reference.
    pub const NAME: &'static str = "PBKDF2WithHmacSHA1";

    const TAG: &'static str = "pbkdf2-sha1";
    const HASH_LEN: usize = 20;

    /// Strategy with the default iteration count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Strategy with an explicit iteration count.
    #[must_use]
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive(passphrase: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey, HashError> {
        let mut out = vec![0u8; Self::HASH_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha1>>(passphrase.as_bytes(), salt, iterations, &mut out)
            .map_err(|e| HashError::Derivation(e.to_string()))?;
        Ok(DerivedKey::new(out))
    }
}

impl PassphraseHasher for Pbkdf2HmacSha1 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn hash(&self, passphrase: &str) -> Result<String, HashError> {
        let mut salt = [0u8; SALT_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
        let derived = Self::derive(passphrase, &salt, self.iterations)?;
        Ok(pack(Self::TAG, self.iterations, &salt, derived.as_bytes()))
    }

    fn verify(&self, passphrase: &str, encoded: &str) -> Result<bool, HashError> {
        let packed = unpack(Self::TAG, encoded)?;
        let candidate = Self::derive(passphrase, &packed.salt, packed.iterations)?;
        Ok(constant_time_eq(candidate.as_bytes(), &packed.hash))
    }
}

impl Default for Pbkdf2HmacSha1 {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PBKDF2-HMAC-SHA256
// =============================================================================

/// PBKDF2 over HMAC-SHA256 with a 256-bit output.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2HmacSha256 {
    iterations: u32,
}

impl Pbkdf2HmacSha256 {
    /// Algorithm name identities reference.
    pub const NAME: &'static str = "PBKDF2WithHmacSHA256";

    const TAG: &'static str = "pbkdf2-sha256";
    const HASH_LEN: usize = 32;

    /// Strategy with the default iteration count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Strategy with an explicit iteration count.
    #[must_use]
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive(passphrase: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey, HashError> {
        let mut out = vec![0u8; Self::HASH_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase.as_bytes(), salt, iterations, &mut out)
            .map_err(|e| HashError::Derivation(e.to_string()))?;
        Ok(DerivedKey::new(out))
    }
}

impl PassphraseHasher for Pbkdf2HmacSha256 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn hash(&self, passphrase: &str) -> Result<String, HashError> {
        let mut salt = [0u8; SALT_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
        let derived = Self::derive(passphrase, &salt, self.iterations)?;
        Ok(pack(Self::TAG, self.iterations, &salt, derived.as_bytes()))
    }

    fn verify(&self, passphrase: &str, encoded: &str) -> Result<bool, HashError> {
        let packed = unpack(Self::TAG, encoded)?;
        let candidate = Self::derive(passphrase, &packed.salt, packed.iterations)?;
        Ok(constant_time_eq(candidate.as_bytes(), &packed.hash))
    }
}

impl Default for Pbkdf2HmacSha256 {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Packed encoding
// =============================================================================

struct PackedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn pack(tag: &str, iterations: u32, salt: &[u8], hash: &[u8]) -> String {
    let engine = base64::engine::general_purpose::STANDARD_NO_PAD;
    format!(
        "{tag}${iterations}${}${}",
        engine.encode(salt),
        engine.encode(hash)
    )
}

fn unpack(expected_tag: &'static str, encoded: &str) -> Result<PackedHash, HashError> {
    let parts: Vec<&str> = encoded.split('$').collect();
    let &[tag, iterations, salt, hash] = parts.as_slice() else {
        return Err(HashError::MalformedEncoding(
            "expected `tag$iterations$salt$hash`".to_string(),
        ));
    };
    if tag != expected_tag {
        return Err(HashError::AlgorithmMismatch {
            expected: expected_tag,
            found: tag.to_string(),
        });
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| HashError::MalformedEncoding(format!("bad iteration count `{iterations}`")))?;
    if iterations == 0 {
        return Err(HashError::MalformedEncoding(
            "zero iteration count".to_string(),
        ));
    }
    let engine = base64::engine::general_purpose::STANDARD_NO_PAD;
    let salt = engine
        .decode(salt)
        .map_err(|e| HashError::MalformedEncoding(format!("salt: {e}")))?;
    let hash = engine
        .decode(hash)
        .map_err(|e| HashError::MalformedEncoding(format!("hash: {e}")))?;
    Ok(PackedHash {
        iterations,
        salt,
        hash,
    })
}

/// Compare a candidate digest against the stored one in constant time.
///
/// Both slices are padded to a common length before comparing, so the
/// slice comparison never branches on length; the lengths themselves
/// compare through the same constant-time machinery.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let longest = a.len().max(b.len());
    // Distinct pad bytes keep the padded copies unequal when lengths differ.
    let mut a_padded = vec![0u8; longest];
    let mut b_padded = vec![0xFFu8; longest];
    a_padded[..a.len()].copy_from_slice(a);
    b_padded[..b.len()].copy_from_slice(b);

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}
