//! # Payload Messages
//!
//! The typed payloads an envelope can carry. [`Payload`] is a closed enum:
//! a carrier holds a document, free text, an event, a command, or nothing.
//! Every variant accumulates error messages in call order so services can
//! report failures without replacing the payload.
//!
//! On the wire each variant is a map carrying its own `type` discriminator,
//! rebuilt through the wire registry.

use crate::wire::{self, WireError, WireMap, MapForm, TYPE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

// ==============================================================================
// Event typing
// ==============================================================================

/// Kind of event an [`EventMessage`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A recoverable error some service wants observers to know about.
    Error,
    /// An exception escaped a handler.
    Exception,
    /// A peer changed reachability or standing.
    PeerStatus,
    /// A service changed lifecycle state.
    ServiceStatus,
    /// A sensor (transport binding) changed state.
    SensorStatus,
    /// Free-form textual notification.
    Text,
}

impl EventType {
    /// Canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Error => "ERROR",
            EventType::Exception => "EXCEPTION",
            EventType::PeerStatus => "PEER_STATUS",
            EventType::ServiceStatus => "SERVICE_STATUS",
            EventType::SensorStatus => "SENSOR_STATUS",
            EventType::Text => "TEXT",
        }
    }

    /// Resolve a canonical wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ERROR" => Some(EventType::Error),
            "EXCEPTION" => Some(EventType::Exception),
            "PEER_STATUS" => Some(EventType::PeerStatus),
            "SERVICE_STATUS" => Some(EventType::ServiceStatus),
            "SENSOR_STATUS" => Some(EventType::SensorStatus),
            "TEXT" => Some(EventType::Text),
            _ => None,
        }
    }
}

// ==============================================================================
// Document messages
// ==============================================================================

/// Payload holding an ordered sequence of keyed data frames.
///
/// Frame zero exists from construction and is the frame the payload
/// accessor reads and writes. Further frames hold additional parts of a
/// multi-part document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMessage {
    /// Data frames, in order. Never empty.
    data: Vec<WireMap>,
    /// Accumulated error reports, in call order.
    error_messages: Vec<String>,
}

impl DocumentMessage {
    /// Wire discriminator.
    pub const TYPE: &'static str = "DocumentMessage";

    /// Create a document with a single empty frame zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: vec![WireMap::new()],
            error_messages: Vec::new(),
        }
    }

    /// Borrow frame zero.
    #[must_use]
    pub fn frame_zero(&self) -> &WireMap {
        // Constructors and hydration guarantee at least one frame.
        &self.data[0]
    }

    /// Borrow frame zero mutably.
    pub fn frame_zero_mut(&mut self) -> &mut WireMap {
        &mut self.data[0]
    }

    /// Borrow a frame by index.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&WireMap> {
        self.data.get(index)
    }

    /// Append an empty frame and return its index.
    pub fn add_frame(&mut self) -> usize {
        self.data.push(WireMap::new());
        self.data.len() - 1
    }

    /// Number of frames. At least one.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.data.len()
    }

    /// Record an error report.
    pub fn add_error_message(&mut self, text: impl Into<String>) {
        self.error_messages.push(text.into());
    }

    /// Error reports in call order.
    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// Rebuild from the canonical map.
    ///
    /// Frames that are not maps are reported and skipped; a document that
    /// arrives with no usable frame still gets its empty frame zero.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; the signature matches the other
    /// message constructors so the registry can treat them uniformly.
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        let mut data = Vec::new();
        if let Some(frames) = wire::get_array(map, "data") {
            for frame in frames {
                match frame {
                    Value::Object(m) => data.push(m.clone()),
                    other => {
                        warn!(
                            "[Payload] Skipping document frame holding {}",
                            wire::shape_of(other)
                        );
                    }
                }
            }
        }
        if data.is_empty() {
            data.push(WireMap::new());
        }
        Ok(Self {
            data,
            error_messages: read_error_messages(map),
        })
    }
}

impl Default for DocumentMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl MapForm for DocumentMessage {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from(Self::TYPE));
        map.insert(
            "data".into(),
            Value::Array(self.data.iter().cloned().map(Value::Object).collect()),
        );
        write_error_messages(&mut map, &self.error_messages);
        map
    }
}

// ==============================================================================
// Text messages
// ==============================================================================

/// Payload holding free text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMessage {
    text: Option<String>,
    error_messages: Vec<String>,
}

impl TextMessage {
    /// Wire discriminator.
    pub const TYPE: &'static str = "TextMessage";

    /// Create an empty text payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a text payload with a body.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error_messages: Vec::new(),
        }
    }

    /// The text body, when set.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace the text body.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Record an error report.
    pub fn add_error_message(&mut self, text: impl Into<String>) {
        self.error_messages.push(text.into());
    }

    /// Error reports in call order.
    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// Rebuild from the canonical map.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; see [`DocumentMessage::from_map`].
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        Ok(Self {
            text: wire::get_str(map, "text"),
            error_messages: read_error_messages(map),
        })
    }
}

impl MapForm for TextMessage {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from(Self::TYPE));
        if let Some(text) = &self.text {
            map.insert("text".into(), Value::from(text.clone()));
        }
        write_error_messages(&mut map, &self.error_messages);
        map
    }
}

// ==============================================================================
// Event messages
// ==============================================================================

/// Payload announcing that something happened.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    event_type: EventType,
    name: Option<String>,
    body: Option<Value>,
    error_messages: Vec<String>,
}

impl EventMessage {
    /// Wire discriminator.
    pub const TYPE: &'static str = "EventMessage";

    /// Create an event of the given kind.
    #[must_use]
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            name: None,
            body: None,
            error_messages: Vec::new(),
        }
    }

    /// The kind of event.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The event name, when set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name the event.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// The event body, when set.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Attach a body.
    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    /// Record an error report.
    pub fn add_error_message(&mut self, text: impl Into<String>) {
        self.error_messages.push(text.into());
    }

    /// Error reports in call order.
    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// Rebuild from the canonical map.
    ///
    /// # Errors
    ///
    /// [`WireError::MissingField`] when `eventType` is absent, or
    /// [`WireError::UnknownName`] when it names no known kind.
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        let name = wire::get_str(map, "eventType").ok_or(WireError::MissingField {
            field: "eventType",
        })?;
        let event_type = EventType::from_name(&name).ok_or(WireError::UnknownName {
            kind: "event type",
            name,
        })?;
        Ok(Self {
            event_type,
            name: wire::get_str(map, "name"),
            body: map.get("message").cloned(),
            error_messages: read_error_messages(map),
        })
    }
}

impl MapForm for EventMessage {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from(Self::TYPE));
        map.insert("eventType".into(), Value::from(self.event_type.as_str()));
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::from(name.clone()));
        }
        if let Some(body) = &self.body {
            map.insert("message".into(), body.clone());
        }
        write_error_messages(&mut map, &self.error_messages);
        map
    }
}

// ==============================================================================
// Command messages
// ==============================================================================

/// Payload carrying an instruction for the bus itself rather than data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandMessage {
    command: Option<String>,
    error_messages: Vec<String>,
}

impl CommandMessage {
    /// Wire discriminator.
    pub const TYPE: &'static str = "CommandMessage";

    /// Create an empty command payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a command payload naming its command.
    #[must_use]
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            error_messages: Vec::new(),
        }
    }

    /// The command name, when set.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Record an error report.
    pub fn add_error_message(&mut self, text: impl Into<String>) {
        self.error_messages.push(text.into());
    }

    /// Error reports in call order.
    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// Rebuild from the canonical map.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; see [`DocumentMessage::from_map`].
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        Ok(Self {
            command: wire::get_str(map, "command"),
            error_messages: read_error_messages(map),
        })
    }
}

impl MapForm for CommandMessage {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from(Self::TYPE));
        if let Some(command) = &self.command {
            map.insert("command".into(), Value::from(command.clone()));
        }
        write_error_messages(&mut map, &self.error_messages);
        map
    }
}

// ==============================================================================
// The closed payload enum
// ==============================================================================

/// What an envelope carries.
///
/// `None` means the envelope is metadata-only (headers, routing); it
/// serializes as an absent `message` field rather than a map.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Keyed data frames (see [`DocumentMessage`]).
    Document(DocumentMessage),
    /// Free text.
    Text(TextMessage),
    /// Event announcement.
    Event(EventMessage),
    /// Bus instruction.
    Command(CommandMessage),
    /// Nothing.
    #[default]
    None,
}

impl Payload {
    /// Wire discriminator of the carried variant, if any.
    #[must_use]
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Payload::Document(_) => Some(DocumentMessage::TYPE),
            Payload::Text(_) => Some(TextMessage::TYPE),
            Payload::Event(_) => Some(EventMessage::TYPE),
            Payload::Command(_) => Some(CommandMessage::TYPE),
            Payload::None => None,
        }
    }

    /// True when nothing is carried.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    /// Borrow the document variant.
    #[must_use]
    pub fn document(&self) -> Option<&DocumentMessage> {
        match self {
            Payload::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow the document variant mutably.
    pub fn document_mut(&mut self) -> Option<&mut DocumentMessage> {
        match self {
            Payload::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow the text variant.
    #[must_use]
    pub fn text(&self) -> Option<&TextMessage> {
        match self {
            Payload::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Borrow the event variant.
    #[must_use]
    pub fn event(&self) -> Option<&EventMessage> {
        match self {
            Payload::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the event variant mutably.
    pub fn event_mut(&mut self) -> Option<&mut EventMessage> {
        match self {
            Payload::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the command variant.
    #[must_use]
    pub fn command(&self) -> Option<&CommandMessage> {
        match self {
            Payload::Command(c) => Some(c),
            _ => None,
        }
    }

    /// Record an error report on the carried variant. No-op when nothing
    /// is carried.
    pub fn add_error_message(&mut self, text: impl Into<String>) {
        match self {
            Payload::Document(d) => d.add_error_message(text),
            Payload::Text(t) => t.add_error_message(text),
            Payload::Event(e) => e.add_error_message(text),
            Payload::Command(c) => c.add_error_message(text),
            Payload::None => {}
        }
    }

    /// Error reports of the carried variant. Empty when nothing is carried.
    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        match self {
            Payload::Document(d) => d.error_messages(),
            Payload::Text(t) => t.error_messages(),
            Payload::Event(e) => e.error_messages(),
            Payload::Command(c) => c.error_messages(),
            Payload::None => &[],
        }
    }

    /// Encode the carried variant to its canonical map. `None` when
    /// nothing is carried, so the enclosing envelope can omit the field.
    #[must_use]
    pub fn to_map(&self) -> Option<WireMap> {
        match self {
            Payload::Document(d) => Some(d.to_map()),
            Payload::Text(t) => Some(t.to_map()),
            Payload::Event(e) => Some(e.to_map()),
            Payload::Command(c) => Some(c.to_map()),
            Payload::None => None,
        }
    }
}

// ==============================================================================
// Shared wire helpers
// ==============================================================================

fn write_error_messages(map: &mut WireMap, messages: &[String]) {
    if !messages.is_empty() {
        map.insert(
            "errorMessages".into(),
            Value::Array(messages.iter().cloned().map(Value::from).collect()),
        );
    }
}

fn read_error_messages(map: &WireMap) -> Vec<String> {
    let Some(entries) = wire::get_array(map, "errorMessages") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}
