//! # Content Carrier
//!
//! A [`Content`] is a document body in transit: raw bytes plus the
//! metadata a receiving service needs to store or render them. On the
//! wire the body travels as base64 text.

use crate::wire::{self, MapForm, WireError, WireMap};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hash algorithm name written next to generated body hashes.
const BODY_HASH_ALGORITHM: &str = "SHA-256";

/// A document body plus its transport metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    body: Option<Vec<u8>>,
    content_type: Option<String>,
    name: Option<String>,
    body_hash: Option<String>,
    body_hash_algorithm: Option<String>,
}

impl Content {
    /// Create content from raw bytes.
    #[must_use]
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    /// Create content from raw bytes with a content type.
    #[must_use]
    pub fn with_content_type(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body: Some(body),
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    /// Create fully described content, optionally hashing the body so the
    /// receiving side can check integrity.
    #[must_use]
    pub fn full(
        body: Vec<u8>,
        content_type: impl Into<String>,
        name: impl Into<String>,
        generate_hash: bool,
    ) -> Self {
        let mut content = Self {
            body: Some(body),
            content_type: Some(content_type.into()),
            name: Some(name.into()),
            body_hash: None,
            body_hash_algorithm: None,
        };
        if generate_hash {
            content.rehash();
        }
        content
    }

    /// The body bytes, when present.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Replace the body. Any previous body hash is stale after this;
    /// call [`Content::rehash`] to refresh it.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    /// Body size in bytes. Zero when no body is present.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }

    /// The content type, when set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The content name, when set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The recorded body hash, when set.
    #[must_use]
    pub fn body_hash(&self) -> Option<&str> {
        self.body_hash.as_deref()
    }

    /// Name of the algorithm behind [`Content::body_hash`].
    #[must_use]
    pub fn body_hash_algorithm(&self) -> Option<&str> {
        self.body_hash_algorithm.as_deref()
    }

    /// Hash the current body and record the digest.
    pub fn rehash(&mut self) {
        if let Some(body) = &self.body {
            let digest = Sha256::digest(body);
            self.body_hash = Some(wire::encode_base64(&digest));
            self.body_hash_algorithm = Some(BODY_HASH_ALGORITHM.to_string());
        }
    }

    /// True when the recorded hash matches the current body. `None` when
    /// either side is missing.
    #[must_use]
    pub fn hash_matches(&self) -> Option<bool> {
        let body = self.body.as_ref()?;
        let recorded = self.body_hash.as_deref()?;
        let digest = Sha256::digest(body);
        Some(wire::encode_base64(&digest) == recorded)
    }

    /// Rebuild from the canonical map.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidBase64`] when the body field does not decode.
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        let body = match wire::get_str(map, "body") {
            Some(text) => Some(wire::decode_base64("body", &text)?),
            None => None,
        };
        Ok(Self {
            body,
            content_type: wire::get_str(map, "contentType"),
            name: wire::get_str(map, "name"),
            body_hash: wire::get_str(map, "bodyHash"),
            body_hash_algorithm: wire::get_str(map, "bodyHashAlgorithm"),
        })
    }
}

impl MapForm for Content {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        if let Some(body) = &self.body {
            map.insert("body".into(), Value::from(wire::encode_base64(body)));
            map.insert("size".into(), Value::from(body.len() as u64));
        }
        if let Some(content_type) = &self.content_type {
            map.insert("contentType".into(), Value::from(content_type.clone()));
        }
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::from(name.clone()));
        }
        if let Some(hash) = &self.body_hash {
            map.insert("bodyHash".into(), Value::from(hash.clone()));
        }
        if let Some(algorithm) = &self.body_hash_algorithm {
            map.insert("bodyHashAlgorithm".into(), Value::from(algorithm.clone()));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_restores_bytes() {
        let content = Content::with_content_type(b"%PDF-1.4 ...".to_vec(), "application/pdf");
        let back = Content::from_map(&content.to_map()).unwrap();
        assert_eq!(back.body(), Some(b"%PDF-1.4 ...".as_slice()));
        assert_eq!(back.content_type(), Some("application/pdf"));
        assert_eq!(back.size(), 12);
    }

    #[test]
    fn test_generated_hash_verifies() {
        let content = Content::full(b"attachment".to_vec(), "text/plain", "note.txt", true);
        assert_eq!(content.body_hash_algorithm(), Some("SHA-256"));
        assert_eq!(content.hash_matches(), Some(true));

        let back = Content::from_map(&content.to_map()).unwrap();
        assert_eq!(back.hash_matches(), Some(true));
    }

    #[test]
    fn test_stale_hash_is_detected() {
        let mut content = Content::full(b"v1".to_vec(), "text/plain", "note.txt", true);
        content.set_body(b"v2".to_vec());
        assert_eq!(content.hash_matches(), Some(false));
        content.rehash();
        assert_eq!(content.hash_matches(), Some(true));
    }

    #[test]
    fn test_bodyless_content_has_no_hash_verdict() {
        let content = Content::default();
        assert_eq!(content.size(), 0);
        assert!(content.hash_matches().is_none());
        assert!(content.to_map().get("body").is_none());
    }

    #[test]
    fn test_garbage_body_fails_hydration() {
        let mut map = WireMap::new();
        map.insert("body".into(), Value::from("!!!"));
        assert!(matches!(
            Content::from_map(&map),
            Err(WireError::InvalidBase64 { .. })
        ));
    }
}
