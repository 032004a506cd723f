//! # Payload Accessor Facade
//!
//! Free functions for reading and writing the well-known slots of an
//! envelope's document payload, so producers and services do not reach
//! into payload internals themselves.
//!
//! ## Wrong-Variant Contract
//!
//! The document slots only exist on a Document payload. Called against any
//! other variant, mutators return `false` and readers return an empty
//! result; nothing here panics or coerces the payload. The two exceptions
//! are [`add_error_message`]/[`error_messages`], which every payload
//! variant carries, and [`add_route`], which targets the routing slip
//! rather than the payload.

use crate::envelope::Envelope;
use crate::message::EventMessage;
use crate::route::SimpleRoute;
use serde_json::Value;
use std::fmt;

/// Frame-zero slot holding the document's primary content.
pub const CONTENT: &str = "CONTENT";

/// Frame-zero slot holding the domain entity the work is about.
pub const ENTITY: &str = "ENTITY";

/// Frame-zero slot accumulating exception reports.
pub const EXCEPTIONS: &str = "EXCEPTIONS";

// ==============================================================================
// Named slots
// ==============================================================================

/// Store the primary content in frame zero. `false` when the payload is
/// not a document.
pub fn add_content(envelope: &Envelope, content: impl Into<Value>) -> bool {
    put_slot(envelope, CONTENT, content.into())
}

/// Read the primary content from frame zero.
#[must_use]
pub fn content(envelope: &Envelope) -> Option<Value> {
    get_slot(envelope, CONTENT)
}

/// Store the domain entity in frame zero. `false` when the payload is
/// not a document.
pub fn add_entity(envelope: &Envelope, entity: impl Into<Value>) -> bool {
    put_slot(envelope, ENTITY, entity.into())
}

/// Read the domain entity from frame zero.
#[must_use]
pub fn entity(envelope: &Envelope) -> Option<Value> {
    get_slot(envelope, ENTITY)
}

/// Store a value under a type identifier. `false` when the payload is
/// not a document.
pub fn add_data(envelope: &Envelope, type_key: &str, value: impl Into<Value>) -> bool {
    put_slot(envelope, type_key, value.into())
}

/// Read the value stored under a type identifier.
#[must_use]
pub fn data(envelope: &Envelope, type_key: &str) -> Option<Value> {
    get_slot(envelope, type_key)
}

/// Store a named value pair. `false` when the payload is not a document.
pub fn add_nvp(envelope: &Envelope, name: &str, value: impl Into<Value>) -> bool {
    put_slot(envelope, name, value.into())
}

/// Read a named value.
#[must_use]
pub fn value(envelope: &Envelope, name: &str) -> Option<Value> {
    get_slot(envelope, name)
}

// ==============================================================================
// Exception accumulation
// ==============================================================================

/// Append an exception report to the `EXCEPTIONS` slot, in call order.
/// Reports are stored as display strings. `false` when the payload is
/// not a document.
pub fn add_exception(envelope: &Envelope, error: impl fmt::Display) -> bool {
    let payload = envelope.payload();
    let mut payload = payload.write();
    let Some(document) = payload.document_mut() else {
        return false;
    };
    let slot = document
        .frame_zero_mut()
        .entry(EXCEPTIONS)
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot.as_array_mut() {
        Some(reports) => {
            reports.push(Value::from(error.to_string()));
            true
        }
        None => false,
    }
}

/// Exception reports accumulated so far, in call order.
///
/// On a document payload whose slot is still absent this installs an
/// empty sequence and returns it, so a later [`add_exception`] and an
/// early reader agree on where the reports live. Empty when the payload
/// is not a document.
pub fn exceptions(envelope: &Envelope) -> Vec<String> {
    let payload = envelope.payload();
    let mut payload = payload.write();
    let Some(document) = payload.document_mut() else {
        return Vec::new();
    };
    let slot = document
        .frame_zero_mut()
        .entry(EXCEPTIONS)
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot.as_array() {
        Some(reports) => reports
            .iter()
            .filter_map(|report| report.as_str().map(str::to_string))
            .collect(),
        None => Vec::new(),
    }
}

// ==============================================================================
// Error messages (any payload variant)
// ==============================================================================

/// Record an error report on the payload, whichever variant it is.
/// Swallowed when the envelope carries no payload.
pub fn add_error_message(envelope: &Envelope, text: impl Into<String>) {
    envelope.payload().write().add_error_message(text);
}

/// Error reports recorded on the payload, in call order.
#[must_use]
pub fn error_messages(envelope: &Envelope) -> Vec<String> {
    envelope.payload().read().error_messages().to_vec()
}

// ==============================================================================
// Routing and event sugar
// ==============================================================================

/// Append a hop to the envelope's itinerary. Not a payload operation;
/// colocated here so producers can stage work and data in one place.
pub fn add_route(
    envelope: &Envelope,
    service: impl Into<String>,
    operation: impl Into<String>,
) -> bool {
    envelope.add_route_handle(SimpleRoute::handle(service, operation));
    true
}

/// The event payload, when the envelope carries one.
#[must_use]
pub fn event_message(envelope: &Envelope) -> Option<EventMessage> {
    envelope.payload().read().event().cloned()
}

// ==============================================================================
// Shared slot plumbing
// ==============================================================================

fn put_slot(envelope: &Envelope, key: &str, value: Value) -> bool {
    let payload = envelope.payload();
    let mut payload = payload.write();
    match payload.document_mut() {
        Some(document) => {
            document.frame_zero_mut().insert(key.to_string(), value);
            true
        }
        None => false,
    }
}

fn get_slot(envelope: &Envelope, key: &str) -> Option<Value> {
    let payload = envelope.payload();
    let payload = payload.read();
    payload.document()?.frame_zero().get(key).cloned()
}
