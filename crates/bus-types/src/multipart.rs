//! # Multipart Container
//!
//! Named [`Content`] parts travelling together under one envelope, the
//! way a browser submits a multipart form. Parts keep their append order.

use crate::content::Content;
use crate::wire::{self, MapForm, WireMap};
use serde_json::Value;
use tracing::warn;

/// An ordered collection of named content parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Multipart {
    content_type: Option<String>,
    boundary: Option<String>,
    parts: Vec<(String, Content)>,
}

impl Multipart {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The container's own content type, when set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Set the container's content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// The part boundary marker, when set.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// Set the part boundary marker.
    pub fn set_boundary(&mut self, boundary: impl Into<String>) {
        self.boundary = Some(boundary.into());
    }

    /// Add a named part. A part under an existing name is replaced in
    /// place, keeping its position.
    pub fn add_part(&mut self, name: impl Into<String>, content: Content) {
        let name = name.into();
        if let Some(slot) = self.parts.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = content;
        } else {
            self.parts.push((name, content));
        }
    }

    /// Look up a part by name.
    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Content> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content)
    }

    /// Parts in append order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &Content)> {
        self.parts
            .iter()
            .map(|(name, content)| (name.as_str(), content))
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when no part was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Rebuild from the canonical map. A part that does not hydrate is
    /// reported and dropped; the rest of the container survives.
    #[must_use]
    pub fn from_map(map: &WireMap) -> Self {
        let mut multipart = Self {
            content_type: wire::get_str(map, "contentType"),
            boundary: wire::get_str(map, "boundary"),
            parts: Vec::new(),
        };
        if let Some(entries) = wire::get_array(map, "parts") {
            for entry in entries {
                let Value::Object(part) = entry else {
                    warn!(
                        "[Multipart] Skipping part holding {}",
                        wire::shape_of(entry)
                    );
                    continue;
                };
                let Some(name) = wire::get_str(part, "name") else {
                    warn!("[Multipart] Skipping nameless part");
                    continue;
                };
                let Some(content_map) = wire::get_map(part, "content") else {
                    warn!("[Multipart] Skipping bodyless part `{name}`");
                    continue;
                };
                match Content::from_map(content_map) {
                    Ok(content) => multipart.add_part(name, content),
                    Err(e) => warn!("[Multipart] Dropping part `{name}`: {e}"),
                }
            }
        }
        multipart
    }
}

impl MapForm for Multipart {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        if let Some(content_type) = &self.content_type {
            map.insert("contentType".into(), Value::from(content_type.clone()));
        }
        if let Some(boundary) = &self.boundary {
            map.insert("boundary".into(), Value::from(boundary.clone()));
        }
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|(name, content)| {
                let mut part = WireMap::new();
                part.insert("name".into(), Value::from(name.clone()));
                part.insert("content".into(), Value::Object(content.to_map()));
                Value::Object(part)
            })
            .collect();
        map.insert("parts".into(), Value::Array(parts));
        map
    }
}
