//! # Canonical Map Form - Wire Codec and Type Registry
//!
//! Every type that crosses a process boundary serializes to the canonical
//! map form: a string-keyed map in which enums travel by name, binary
//! travels as base64 text, absent fields are omitted rather than written
//! as null, and nested collaborators nest as maps or arrays.
//!
//! ## Polymorphic Reconstruction
//!
//! Maps describing a polymorphic value (routes, payload messages) carry a
//! `type` discriminator. Rehydration resolves the discriminator through a
//! [`WireRegistry`] of constructor functions. The registry is explicit and
//! injectable; nothing is ever resolved from a language-level class path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = WireRegistry::with_defaults();
//! let map = envelope.to_map();
//! let restored = Envelope::from_map(&map, &registry)?;
//! ```

use crate::message::Payload;
use crate::route::RouteHandle;
use base64::Engine;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// The canonical map form: string keys, JSON-shaped values.
pub type WireMap = serde_json::Map<String, Value>;

/// Key under which polymorphic maps carry their type discriminator.
pub const TYPE_KEY: &str = "type";

// ==============================================================================
// Errors
// ==============================================================================

/// Errors from encoding or decoding the canonical map form.
///
/// Decoding a polymorphic field is recoverable by contract: callers log the
/// error and leave the field absent while sibling fields continue hydrating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A field the type cannot be rebuilt without is missing.
    #[error("Required field `{field}` is missing")]
    MissingField { field: &'static str },

    /// A field is present but holds the wrong shape of value.
    #[error("Field `{field}` holds {found}, expected {expected}")]
    WrongShape {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An enum field carries a name no variant answers to.
    #[error("Unknown {kind} name `{name}`")]
    UnknownName { kind: &'static str, name: String },

    /// A polymorphic map carries no `type` discriminator.
    #[error("Map carries no `{TYPE_KEY}` discriminator")]
    MissingDiscriminator,

    /// No constructor is registered for a discriminator.
    #[error("No constructor registered for type `{discriminator}`")]
    UnknownDiscriminator { discriminator: String },

    /// A binary field does not decode as base64.
    #[error("Field `{field}` is not valid base64: {reason}")]
    InvalidBase64 { field: String, reason: String },

    /// JSON text could not be parsed, or did not hold a map at the top.
    #[error("Malformed JSON text: {reason}")]
    Json { reason: String },
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Json {
            reason: e.to_string(),
        }
    }
}

// ==============================================================================
// Map-form trait and JSON text round-trip
// ==============================================================================

/// Types that encode themselves to the canonical map form.
///
/// Decoding is inherent per type because signatures differ: types with
/// polymorphic fields additionally take a [`WireRegistry`].
pub trait MapForm {
    /// Encode to the canonical map form.
    fn to_map(&self) -> WireMap;

    /// Encode to JSON text (the map form rendered as a JSON object).
    fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

/// Parse JSON text into a canonical map.
///
/// # Errors
///
/// Returns [`WireError::Json`] when the text does not parse or the top
/// level is not an object.
pub fn map_from_json(text: &str) -> Result<WireMap, WireError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(WireError::Json {
            reason: format!("expected a JSON object, found {}", shape_of(&other)),
        }),
    }
}

// ==============================================================================
// Lenient field accessors
// ==============================================================================
//
// Maps produced by older peers spell numbers and booleans as strings.
// These accessors take either spelling.

/// Read a string field.
#[must_use]
pub fn get_str(map: &WireMap, field: &str) -> Option<String> {
    match map.get(field)? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Read an integer field, accepting a string-spelled number.
#[must_use]
pub fn get_i64(map: &WireMap, field: &str) -> Option<i64> {
    match map.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean field, accepting a string-spelled boolean.
#[must_use]
pub fn get_bool(map: &WireMap, field: &str) -> Option<bool> {
    match map.get(field)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Borrow a nested map field.
#[must_use]
pub fn get_map<'a>(map: &'a WireMap, field: &str) -> Option<&'a WireMap> {
    match map.get(field)? {
        Value::Object(m) => Some(m),
        _ => None,
    }
}

/// Borrow an array field.
#[must_use]
pub fn get_array<'a>(map: &'a WireMap, field: &str) -> Option<&'a Vec<Value>> {
    match map.get(field)? {
        Value::Array(a) => Some(a),
        _ => None,
    }
}

/// Human name for a JSON value's shape, used in error reports.
#[must_use]
pub fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

// ==============================================================================
// Binary fields
// ==============================================================================

/// Encode bytes for a binary wire field.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a binary wire field.
///
/// # Errors
///
/// Returns [`WireError::InvalidBase64`] naming the offending field.
pub fn decode_base64(field: &str, text: &str) -> Result<Vec<u8>, WireError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| WireError::InvalidBase64 {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// ==============================================================================
// Wire registry
// ==============================================================================

/// Constructor for a registered route type.
pub type RouteCtor = fn(&WireMap) -> Result<RouteHandle, WireError>;

/// Constructor for a registered payload message type.
pub type MessageCtor = fn(&WireMap) -> Result<Payload, WireError>;

/// Registry of constructors for polymorphic wire types.
///
/// Rehydration resolves `type` discriminators here. Services extend the
/// registry with their own route or message types at startup; the kernel
/// pre-registers its own under [`WireRegistry::with_defaults`].
pub struct WireRegistry {
    /// Route constructors by discriminator.
    routes: RwLock<HashMap<String, RouteCtor>>,
    /// Message constructors by discriminator.
    messages: RwLock<HashMap<String, MessageCtor>>,
}

impl WireRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry pre-loaded with the kernel's own types:
    /// [`SimpleRoute`](crate::route::SimpleRoute) and the four payload
    /// message variants.
    #[must_use]
    pub fn with_defaults() -> Self {
        use crate::message::{CommandMessage, DocumentMessage, EventMessage, TextMessage};
        use crate::route::SimpleRoute;
        use std::sync::Arc;

        let registry = Self::new();

        registry.register_route(SimpleRoute::TYPE, |m| {
            Ok(Arc::new(SimpleRoute::from_map(m)?) as RouteHandle)
        });

        registry.register_message(DocumentMessage::TYPE, |m| {
            Ok(Payload::Document(DocumentMessage::from_map(m)?))
        });
        registry.register_message(TextMessage::TYPE, |m| {
            Ok(Payload::Text(TextMessage::from_map(m)?))
        });
        registry.register_message(EventMessage::TYPE, |m| {
            Ok(Payload::Event(EventMessage::from_map(m)?))
        });
        registry.register_message(CommandMessage::TYPE, |m| {
            Ok(Payload::Command(CommandMessage::from_map(m)?))
        });

        registry
    }

    /// Register a route constructor under a discriminator.
    ///
    /// Registering an already-known discriminator replaces the previous
    /// constructor.
    pub fn register_route(&self, discriminator: impl Into<String>, ctor: RouteCtor) {
        let discriminator = discriminator.into();
        debug!("[Wire] Registering route type `{discriminator}`");
        self.routes.write().insert(discriminator, ctor);
    }

    /// Register a message constructor under a discriminator.
    pub fn register_message(&self, discriminator: impl Into<String>, ctor: MessageCtor) {
        let discriminator = discriminator.into();
        debug!("[Wire] Registering message type `{discriminator}`");
        self.messages.write().insert(discriminator, ctor);
    }

    /// Rebuild a route from its map.
    ///
    /// # Errors
    ///
    /// [`WireError::MissingDiscriminator`] when the map carries no `type`,
    /// [`WireError::UnknownDiscriminator`] when nothing is registered for
    /// it, or whatever the constructor itself reports.
    pub fn build_route(&self, map: &WireMap) -> Result<RouteHandle, WireError> {
        let discriminator = get_str(map, TYPE_KEY).ok_or(WireError::MissingDiscriminator)?;
        let ctor = self
            .routes
            .read()
            .get(&discriminator)
            .copied()
            .ok_or(WireError::UnknownDiscriminator { discriminator })?;
        ctor(map)
    }

    /// Rebuild a payload message from its map.
    ///
    /// # Errors
    ///
    /// Same contract as [`WireRegistry::build_route`].
    pub fn build_message(&self, map: &WireMap) -> Result<Payload, WireError> {
        let discriminator = get_str(map, TYPE_KEY).ok_or(WireError::MissingDiscriminator)?;
        let ctor = self
            .messages
            .read()
            .get(&discriminator)
            .copied()
            .ok_or(WireError::UnknownDiscriminator { discriminator })?;
        ctor(map)
    }

    /// Discriminators with a registered route constructor, sorted.
    #[must_use]
    pub fn route_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.routes.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Discriminators with a registered message constructor, sorted.
    #[must_use]
    pub fn message_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.messages.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for WireRegistry {
    /// The default registry is the pre-loaded one; an empty registry is
    /// only useful to hosts that replace every kernel type.
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_scalars_accept_string_spellings() {
        let mut map = WireMap::new();
        map.insert("n".into(), Value::from("42"));
        map.insert("b".into(), Value::from("true"));
        map.insert("plain_n".into(), Value::from(7));
        map.insert("plain_b".into(), Value::from(false));

        assert_eq!(get_i64(&map, "n"), Some(42));
        assert_eq!(get_bool(&map, "b"), Some(true));
        assert_eq!(get_i64(&map, "plain_n"), Some(7));
        assert_eq!(get_bool(&map, "plain_b"), Some(false));
        assert_eq!(get_i64(&map, "absent"), None);
    }

    #[test]
    fn test_base64_round_trip() {
        let bytes = b"not all who wander are lost";
        let text = encode_base64(bytes);
        let back = decode_base64("body", &text).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let result = decode_base64("body", "!!!not-base64!!!");
        assert!(matches!(result, Err(WireError::InvalidBase64 { .. })));
    }

    #[test]
    fn test_registry_rejects_unknown_discriminator() {
        let registry = WireRegistry::with_defaults();
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from("TeleportRoute"));

        let result = registry.build_route(&map);
        assert!(matches!(
            result,
            Err(WireError::UnknownDiscriminator { .. })
        ));
    }

    #[test]
    fn test_registry_rejects_missing_discriminator() {
        let registry = WireRegistry::with_defaults();
        let map = WireMap::new();

        assert!(matches!(
            registry.build_route(&map),
            Err(WireError::MissingDiscriminator)
        ));
        assert!(matches!(
            registry.build_message(&map),
            Err(WireError::MissingDiscriminator)
        ));
    }

    #[test]
    fn test_default_registry_knows_kernel_types() {
        let registry = WireRegistry::with_defaults();
        assert_eq!(registry.route_types(), vec!["SimpleRoute".to_string()]);
        assert_eq!(
            registry.message_types(),
            vec![
                "CommandMessage".to_string(),
                "DocumentMessage".to_string(),
                "EventMessage".to_string(),
                "TextMessage".to_string(),
            ]
        );
    }

    #[test]
    fn test_map_from_json_requires_object() {
        assert!(map_from_json("{\"a\": 1}").is_ok());
        assert!(matches!(
            map_from_json("[1, 2]"),
            Err(WireError::Json { .. })
        ));
        assert!(matches!(map_from_json("not json"), Err(WireError::Json { .. })));
    }
}
