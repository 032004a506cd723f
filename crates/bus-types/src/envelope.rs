//! # The Envelope - Unit of Work on the Bus
//!
//! Every piece of work crossing the bus travels as one [`Envelope`]: a
//! numeric identity, a [`Did`], a [`DynamicRoutingSlip`] the dispatcher
//! consumes hop-by-hop, a typed [`Payload`], an open headers bag, and
//! delivery metadata. Services never talk to each other directly; they
//! mutate the envelope and hand it back.
//!
//! ## Aliasing
//!
//! [`Envelope::alias`] creates a second handle onto the same unit of work:
//! the alias keeps the source's identifier and shares its headers bag,
//! identity, routing slip, and payload by reference, while scalar metadata
//! is copied. Mutations through either handle are visible through both.
//! An alias and its original must not be dispatched concurrently; the
//! slip cursor expects a single dispatcher.
//!
//! ## Sensitivity
//!
//! [`Sensitivity`] steers transport selection. Tiers are totally ordered;
//! a relay may raise the tier of what it forwards, never lower it.

use crate::did::Did;
use crate::ids::{IdSource, RandomIdSource};
use crate::message::{CommandMessage, DocumentMessage, EventMessage, EventType, Payload, TextMessage};
use crate::multipart::Multipart;
use crate::route::{DynamicRoutingSlip, RouteHandle, SharedSlip, SimpleRoute};
use crate::wire::{self, MapForm, WireError, WireMap, WireRegistry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

/// Shared handle to an envelope's headers bag.
pub type SharedHeaders = Arc<RwLock<WireMap>>;

/// Shared handle to an envelope's identity.
pub type SharedDid = Arc<RwLock<Did>>;

/// Shared handle to an envelope's payload.
pub type SharedPayload = Arc<RwLock<Payload>>;

// ==============================================================================
// Delivery metadata enums
// ==============================================================================

/// What the sender wants done with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create.
    Add,
    /// Modify in place.
    Update,
    /// Delete.
    Remove,
    /// Read only.
    View,
}

impl Action {
    /// Canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "ADD",
            Action::Update => "UPDATE",
            Action::Remove => "REMOVE",
            Action::View => "VIEW",
        }
    }

    /// Resolve a canonical wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADD" => Some(Action::Add),
            "UPDATE" => Some(Action::Update),
            "REMOVE" => Some(Action::Remove),
            "VIEW" => Some(Action::View),
            _ => None,
        }
    }
}

/// How strongly the envelope's contents must be protected in transit.
///
/// Tiers are totally ordered by declaration. Each tier names the weakest
/// transport a relay may pick for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    /// Cleartext HTTP is acceptable.
    None,
    /// HTTPS.
    Low,
    /// Tor.
    Medium,
    /// I2P. The default for everything on the bus.
    High,
    /// I2P tuned for high-delay delivery, purging aggressively.
    #[serde(rename = "VERYHIGH")]
    VeryHigh,
    /// Direct neighbor-to-neighbor delivery only; no open network.
    Extreme,
    /// Neighbor-to-neighbor into an uncompromised node, then high-delay
    /// I2P onward.
    Neo,
}

impl Sensitivity {
    /// Canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::None => "NONE",
            Sensitivity::Low => "LOW",
            Sensitivity::Medium => "MEDIUM",
            Sensitivity::High => "HIGH",
            Sensitivity::VeryHigh => "VERYHIGH",
            Sensitivity::Extreme => "EXTREME",
            Sensitivity::Neo => "NEO",
        }
    }

    /// Resolve a canonical wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NONE" => Some(Sensitivity::None),
            "LOW" => Some(Sensitivity::Low),
            "MEDIUM" => Some(Sensitivity::Medium),
            "HIGH" => Some(Sensitivity::High),
            "VERYHIGH" => Some(Sensitivity::VeryHigh),
            "EXTREME" => Some(Sensitivity::Extreme),
            "NEO" => Some(Sensitivity::Neo),
            _ => None,
        }
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::High
    }
}

// ==============================================================================
// The envelope
// ==============================================================================

/// Mutable unit of work crossing the bus.
#[derive(Debug)]
pub struct Envelope {
    /// Identifier. Fixed at construction; aliases keep it.
    id: i64,
    /// Whether the envelope arrived from outside the local bus.
    external: bool,
    /// The itinerary, shared with aliases.
    slip: SharedSlip,
    /// The hop most recently handed out by [`Envelope::next_route`].
    route: Option<RouteHandle>,
    /// The identity this work travels under, shared with aliases.
    did: SharedDid,
    /// Client correlation identifier. Zero when no client waits.
    client: i64,
    /// Whether the originating client expects the envelope back.
    reply_to_client: bool,
    /// Client-side action to run on reply.
    client_reply_action: Option<String>,
    /// Resource locator the work targets, when any.
    url: Option<String>,
    /// Multipart attachments, when any.
    multipart: Option<Multipart>,
    /// What the sender wants done.
    action: Option<Action>,
    /// Slash-separated path for command-style requests.
    command_path: Option<String>,
    /// Open string-keyed headers bag, shared with aliases.
    headers: SharedHeaders,
    /// The payload, shared with aliases.
    payload: SharedPayload,
    /// Transport protection tier.
    sensitivity: Sensitivity,
}

impl Envelope {
    /// Header name for content disposition.
    pub const HEADER_CONTENT_DISPOSITION: &'static str = "Content-Disposition";
    /// Header name for transfer encoding.
    pub const HEADER_CONTENT_TRANSFER_ENCODING: &'static str = "Content-Transfer-Encoding";
    /// Header name for content type.
    pub const HEADER_CONTENT_TYPE: &'static str = "Content-Type";
    /// Content-type value for JSON bodies.
    pub const HEADER_CONTENT_TYPE_JSON: &'static str = "application/json";
    /// Header name for the user agent.
    pub const HEADER_USER_AGENT: &'static str = "User-Agent";

    /// Create a bare envelope with the given identifier: no payload, a
    /// fresh identity, an empty slip, sensitivity [`Sensitivity::High`].
    #[must_use]
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            external: false,
            slip: Arc::new(RwLock::new(DynamicRoutingSlip::new())),
            route: None,
            did: Arc::new(RwLock::new(Did::new())),
            client: 0,
            reply_to_client: false,
            client_reply_action: None,
            url: None,
            multipart: None,
            action: None,
            command_path: None,
            headers: Arc::new(RwLock::new(WireMap::new())),
            payload: Arc::new(RwLock::new(Payload::None)),
            sensitivity: Sensitivity::default(),
        }
    }

    /// Fresh envelope carrying an empty document.
    #[must_use]
    pub fn document() -> Self {
        EnvelopeFactory::default().document()
    }

    /// Envelope with a caller-chosen identifier carrying an empty
    /// document.
    #[must_use]
    pub fn document_with_id(id: i64) -> Self {
        let envelope = Envelope::with_id(id);
        envelope.set_payload(Payload::Document(DocumentMessage::new()));
        envelope
    }

    /// Fresh envelope carrying an empty command.
    #[must_use]
    pub fn command() -> Self {
        EnvelopeFactory::default().command()
    }

    /// Fresh metadata-only envelope.
    #[must_use]
    pub fn headers_only() -> Self {
        EnvelopeFactory::default().headers_only()
    }

    /// Fresh envelope announcing an event.
    #[must_use]
    pub fn event(event_type: EventType) -> Self {
        EnvelopeFactory::default().event(event_type)
    }

    /// Fresh envelope carrying empty text.
    #[must_use]
    pub fn text() -> Self {
        EnvelopeFactory::default().text()
    }

    /// Second handle onto this unit of work.
    ///
    /// The alias keeps this envelope's identifier and shares the headers
    /// bag, the identity, the routing slip, and the payload by reference;
    /// scalar metadata is copied. Mutations through either handle are
    /// visible through both. Dispatch one handle at a time.
    #[must_use]
    pub fn alias(&self) -> Envelope {
        Envelope {
            id: self.id,
            external: self.external,
            slip: Arc::clone(&self.slip),
            route: self.route.clone(),
            did: Arc::clone(&self.did),
            client: self.client,
            reply_to_client: self.reply_to_client,
            client_reply_action: self.client_reply_action.clone(),
            url: self.url.clone(),
            multipart: self.multipart.clone(),
            action: self.action,
            command_path: self.command_path.clone(),
            headers: Arc::clone(&self.headers),
            payload: Arc::clone(&self.payload),
            sensitivity: self.sensitivity,
        }
    }

    // ===== Identity and metadata =====

    /// The envelope identifier.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Whether the envelope arrived from outside the local bus.
    #[must_use]
    pub fn external(&self) -> bool {
        self.external
    }

    /// Mark origin.
    pub fn set_external(&mut self, external: bool) {
        self.external = external;
    }

    /// Client correlation identifier.
    #[must_use]
    pub fn client(&self) -> i64 {
        self.client
    }

    /// Set the client correlation identifier.
    pub fn set_client(&mut self, client: i64) {
        self.client = client;
    }

    /// Whether the originating client expects the envelope back.
    #[must_use]
    pub fn reply_to_client(&self) -> bool {
        self.reply_to_client
    }

    /// Set the reply expectation.
    pub fn set_reply_to_client(&mut self, reply: bool) {
        self.reply_to_client = reply;
    }

    /// Client-side action to run on reply, when set.
    #[must_use]
    pub fn client_reply_action(&self) -> Option<&str> {
        self.client_reply_action.as_deref()
    }

    /// Set the client-side reply action.
    pub fn set_client_reply_action(&mut self, action: impl Into<String>) {
        self.client_reply_action = Some(action.into());
    }

    /// Resource locator the work targets, when set.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Set the resource locator.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// Multipart attachments, when present.
    #[must_use]
    pub fn multipart(&self) -> Option<&Multipart> {
        self.multipart.as_ref()
    }

    /// Attach multipart content.
    pub fn set_multipart(&mut self, multipart: Multipart) {
        self.multipart = Some(multipart);
    }

    /// What the sender wants done, when stated.
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        self.action
    }

    /// State the intended action.
    pub fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    /// Slash-separated command path, when set.
    #[must_use]
    pub fn command_path(&self) -> Option<&str> {
        self.command_path.as_deref()
    }

    /// Set the command path.
    pub fn set_command_path(&mut self, path: impl Into<String>) {
        self.command_path = Some(path.into());
    }

    /// Transport protection tier.
    #[must_use]
    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Set the transport protection tier.
    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
    }

    // ===== Shared collaborators =====

    /// Handle to the identity. Shared with aliases.
    #[must_use]
    pub fn did(&self) -> SharedDid {
        Arc::clone(&self.did)
    }

    /// Replace the identity in place. Aliases observe the replacement.
    pub fn set_did(&self, did: Did) {
        *self.did.write() = did;
    }

    /// Handle to the headers bag. Shared with aliases.
    #[must_use]
    pub fn headers(&self) -> SharedHeaders {
        Arc::clone(&self.headers)
    }

    /// Handle to the routing slip. Shared with aliases.
    #[must_use]
    pub fn slip(&self) -> SharedSlip {
        Arc::clone(&self.slip)
    }

    /// Handle to the payload. Shared with aliases.
    #[must_use]
    pub fn payload(&self) -> SharedPayload {
        Arc::clone(&self.payload)
    }

    /// Replace the payload in place. Aliases observe the replacement.
    pub fn set_payload(&self, payload: Payload) {
        *self.payload.write() = payload;
    }

    // ===== Headers =====

    /// Read a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .read()
            .get(name)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .write()
            .insert(name.into(), Value::from(value.into()));
    }

    /// True when a header is present under `name`.
    #[must_use]
    pub fn header_exists(&self, name: &str) -> bool {
        self.headers.read().contains_key(name)
    }

    /// Remove a header, returning its text when one was set.
    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.headers
            .write()
            .remove(name)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// The `Content-Type` header, when set.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header(Self::HEADER_CONTENT_TYPE)
    }

    /// Set the `Content-Type` header.
    pub fn set_content_type(&self, content_type: impl Into<String>) {
        self.set_header(Self::HEADER_CONTENT_TYPE, content_type);
    }

    // ===== Routing =====

    /// Append a hop to the itinerary. Legal mid-flight; visible through
    /// every alias.
    pub fn add_route(&self, service: impl Into<String>, operation: impl Into<String>) {
        self.slip
            .write()
            .add_route(SimpleRoute::handle(service, operation));
    }

    /// Append a custom route implementation.
    pub fn add_route_handle(&self, route: RouteHandle) {
        self.slip.write().add_route(route);
    }

    /// Append a hop and mark the envelope as externally bound.
    pub fn add_external_route(
        &mut self,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) {
        self.external = true;
        self.add_route(service, operation);
    }

    /// The hop most recently handed out, without advancing.
    #[must_use]
    pub fn route(&self) -> Option<&RouteHandle> {
        self.route.as_ref()
    }

    /// Advance the itinerary and cache the hop handed out. `None` once
    /// the slip is exhausted; an append reopens it.
    pub fn next_route(&mut self) -> Option<RouteHandle> {
        let next = self.slip.write().next_route();
        self.route.clone_from(&next);
        next
    }

    /// True once every current hop has been consumed.
    #[must_use]
    pub fn routing_complete(&self) -> bool {
        self.slip.read().is_complete()
    }

    // ===== Wire =====

    /// Rebuild from the canonical map.
    ///
    /// The identifier is the one indispensable field. Everything else
    /// hydrates leniently: a polymorphic field that fails to rebuild
    /// (slip, cached route, payload message) is reported and left absent
    /// while sibling fields continue.
    ///
    /// # Errors
    ///
    /// [`WireError::MissingField`] when `id` is absent or unreadable.
    pub fn from_map(map: &WireMap, registry: &WireRegistry) -> Result<Envelope, WireError> {
        let id = wire::get_i64(map, "id").ok_or(WireError::MissingField { field: "id" })?;
        let mut envelope = Envelope::with_id(id);

        envelope.external = wire::get_bool(map, "external").unwrap_or(false);
        envelope.client = wire::get_i64(map, "client").unwrap_or(0);
        envelope.reply_to_client = wire::get_bool(map, "replyToClient").unwrap_or(false);
        envelope.client_reply_action = wire::get_str(map, "clientReplyAction");
        envelope.url = wire::get_str(map, "url");
        envelope.command_path = wire::get_str(map, "commandPath");

        if let Some(name) = wire::get_str(map, "action") {
            match Action::from_name(&name) {
                Some(action) => envelope.action = Some(action),
                None => warn!("[Envelope] Dropping unknown action `{name}`"),
            }
        }
        if let Some(name) = wire::get_str(map, "sensitivity") {
            match Sensitivity::from_name(&name) {
                Some(sensitivity) => envelope.sensitivity = sensitivity,
                None => warn!("[Envelope] Dropping unknown sensitivity `{name}`, keeping HIGH"),
            }
        }

        if let Some(slip_map) = wire::get_map(map, "dynamicRoutingSlip") {
            match DynamicRoutingSlip::from_map(slip_map, registry) {
                Ok(slip) => *envelope.slip.write() = slip,
                Err(e) => warn!("[Envelope] Dropping routing slip: {e}"),
            }
        }
        if let Some(route_map) = wire::get_map(map, "route") {
            match registry.build_route(route_map) {
                Ok(route) => envelope.route = Some(route),
                Err(e) => warn!("[Envelope] Dropping current route: {e}"),
            }
        }
        if let Some(did_map) = wire::get_map(map, "did") {
            *envelope.did.write() = Did::from_map(did_map);
        }
        if let Some(headers) = wire::get_map(map, "headers") {
            *envelope.headers.write() = headers.clone();
        }
        if let Some(message_map) = wire::get_map(map, "message") {
            match registry.build_message(message_map) {
                Ok(payload) => envelope.set_payload(payload),
                Err(e) => warn!("[Envelope] Dropping payload message: {e}"),
            }
        }
        if let Some(multipart_map) = wire::get_map(map, "multipart") {
            envelope.multipart = Some(Multipart::from_map(multipart_map));
        }

        Ok(envelope)
    }

    /// Rebuild from JSON text.
    ///
    /// # Errors
    ///
    /// [`WireError::Json`] for unparseable text, otherwise the
    /// [`Envelope::from_map`] contract.
    pub fn from_json(text: &str, registry: &WireRegistry) -> Result<Envelope, WireError> {
        Self::from_map(&wire::map_from_json(text)?, registry)
    }
}

/// Envelope equality is identifier equality; an alias is equal to its
/// original.
impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Envelope {}

impl Hash for Envelope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl MapForm for Envelope {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert("id".into(), Value::from(self.id));
        map.insert("external".into(), Value::from(self.external));
        map.insert(
            "dynamicRoutingSlip".into(),
            Value::Object(self.slip.read().to_map()),
        );
        if let Some(route) = &self.route {
            map.insert("route".into(), Value::Object(route.to_map()));
        }
        map.insert("did".into(), Value::Object(self.did.read().to_map()));
        map.insert("client".into(), Value::from(self.client));
        map.insert("replyToClient".into(), Value::from(self.reply_to_client));
        if let Some(action) = &self.client_reply_action {
            map.insert("clientReplyAction".into(), Value::from(action.clone()));
        }
        if let Some(url) = &self.url {
            map.insert("url".into(), Value::from(url.clone()));
        }
        if let Some(multipart) = &self.multipart {
            map.insert("multipart".into(), Value::Object(multipart.to_map()));
        }
        if let Some(action) = self.action {
            map.insert("action".into(), Value::from(action.as_str()));
        }
        if let Some(path) = &self.command_path {
            map.insert("commandPath".into(), Value::from(path.clone()));
        }
        map.insert("headers".into(), Value::Object(self.headers.read().clone()));
        if let Some(message) = self.payload.read().to_map() {
            map.insert("message".into(), Value::Object(message));
        }
        map.insert("sensitivity".into(), Value::from(self.sensitivity.as_str()));
        map
    }
}

// ==============================================================================
// Factory
// ==============================================================================

/// Creates envelopes with identifiers drawn from an injected source.
///
/// The [`Default`] factory draws random identifiers; tests inject a
/// [`CounterIdSource`](crate::ids::CounterIdSource) for determinism.
pub struct EnvelopeFactory {
    ids: Arc<dyn IdSource>,
}

impl EnvelopeFactory {
    /// Create a factory drawing identifiers from `ids`.
    #[must_use]
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        Self { ids }
    }

    /// Envelope carrying an empty document.
    #[must_use]
    pub fn document(&self) -> Envelope {
        let envelope = Envelope::with_id(self.ids.next_id());
        envelope.set_payload(Payload::Document(DocumentMessage::new()));
        envelope
    }

    /// Envelope carrying an empty command.
    #[must_use]
    pub fn command(&self) -> Envelope {
        let envelope = Envelope::with_id(self.ids.next_id());
        envelope.set_payload(Payload::Command(CommandMessage::new()));
        envelope
    }

    /// Metadata-only envelope.
    #[must_use]
    pub fn headers_only(&self) -> Envelope {
        Envelope::with_id(self.ids.next_id())
    }

    /// Envelope announcing an event.
    #[must_use]
    pub fn event(&self, event_type: EventType) -> Envelope {
        let envelope = Envelope::with_id(self.ids.next_id());
        envelope.set_payload(Payload::Event(EventMessage::new(event_type)));
        envelope
    }

    /// Envelope carrying empty text.
    #[must_use]
    pub fn text(&self) -> Envelope {
        let envelope = Envelope::with_id(self.ids.next_id());
        envelope.set_payload(Payload::Text(TextMessage::new()));
        envelope
    }
}

impl Default for EnvelopeFactory {
    fn default() -> Self {
        Self::new(Arc::new(RandomIdSource::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CounterIdSource;

    #[test]
    fn test_document_factory_defaults() {
        let envelope = Envelope::document();
        assert!(envelope.id() >= 0);
        assert!(!envelope.external());
        assert_eq!(envelope.client(), 0);
        assert!(!envelope.reply_to_client());
        assert_eq!(envelope.sensitivity(), Sensitivity::High);
        assert!(envelope.route().is_none());
        assert!(envelope.routing_complete());

        let payload = envelope.payload();
        let payload = payload.read();
        let document = payload.document().unwrap();
        assert_eq!(document.frames(), 1);
    }

    #[test]
    fn test_factory_draws_from_injected_source() {
        let factory = EnvelopeFactory::new(Arc::new(CounterIdSource::starting_at(100)));
        assert_eq!(factory.document().id(), 100);
        assert_eq!(factory.command().id(), 101);
        assert_eq!(factory.headers_only().id(), 102);
    }

    #[test]
    fn test_document_with_id_keeps_the_id() {
        let envelope = Envelope::document_with_id(424_242);
        assert_eq!(envelope.id(), 424_242);
        assert!(envelope.payload().read().document().is_some());
    }

    #[test]
    fn test_event_factory_types_the_payload() {
        let envelope = Envelope::event(EventType::ServiceStatus);
        let payload = envelope.payload();
        let payload = payload.read();
        assert_eq!(
            payload.event().unwrap().event_type(),
            EventType::ServiceStatus
        );
    }

    #[test]
    fn test_alias_retains_id_and_shares_collaborators() {
        let mut original = Envelope::document();
        let alias = original.alias();
        assert_eq!(alias, original);
        assert_eq!(alias.id(), original.id());

        // Route appended through the alias is dispatched from the original.
        alias.add_route("keyring", "sign");
        let hop = original.next_route().unwrap();
        assert_eq!(hop.service(), "keyring");

        // Headers flow both ways.
        alias.set_header("X-Relay", "bridge-4");
        assert_eq!(original.header("X-Relay").as_deref(), Some("bridge-4"));

        // Payload mutations flow both ways.
        alias.payload().write().add_error_message("relay refused");
        assert_eq!(
            original.payload().read().error_messages(),
            ["relay refused"]
        );

        // Trust flags flip on the one shared identity.
        alias.did().read().set_verified(true);
        assert!(original.did().read().verified());
    }

    #[test]
    fn test_alias_copies_scalars_by_value() {
        let mut original = Envelope::document();
        original.set_sensitivity(Sensitivity::Medium);
        let mut alias = original.alias();

        original.set_sensitivity(Sensitivity::Neo);
        assert_eq!(alias.sensitivity(), Sensitivity::Medium);

        alias.set_client(7);
        assert_eq!(original.client(), 0);
    }

    #[test]
    fn test_equality_is_id_equality() {
        assert_eq!(Envelope::with_id(7), Envelope::with_id(7));
        assert_ne!(Envelope::with_id(7), Envelope::with_id(8));
    }

    #[test]
    fn test_next_route_caches_the_hop() {
        let mut envelope = Envelope::headers_only();
        envelope.add_route("ipfs", "store");
        envelope.add_route("email", "send");

        assert!(envelope.route().is_none());
        envelope.next_route();
        assert_eq!(envelope.route().unwrap().service(), "ipfs");
        envelope.next_route();
        assert_eq!(envelope.route().unwrap().service(), "email");
        assert!(envelope.next_route().is_none());
    }

    #[test]
    fn test_add_external_route_marks_origin() {
        let mut envelope = Envelope::headers_only();
        envelope.add_external_route("tor", "relay");
        assert!(envelope.external());
        assert_eq!(envelope.slip().read().number_of_routes(), 1);
    }

    #[test]
    fn test_content_type_sugar_reads_the_headers_bag() {
        let envelope = Envelope::headers_only();
        assert!(envelope.content_type().is_none());
        envelope.set_content_type(Envelope::HEADER_CONTENT_TYPE_JSON);
        assert_eq!(
            envelope.header(Envelope::HEADER_CONTENT_TYPE).as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_header_exists_and_remove() {
        let envelope = Envelope::headers_only();
        assert!(!envelope.header_exists("X-Relay"));

        envelope.set_header("X-Relay", "bridge-4");
        assert!(envelope.header_exists("X-Relay"));

        let removed = envelope.remove_header("X-Relay");
        assert_eq!(removed.as_deref(), Some("bridge-4"));
        assert!(!envelope.header_exists("X-Relay"));
        assert!(envelope.header("X-Relay").is_none());

        // Removing an absent header answers None, no error.
        assert!(envelope.remove_header("X-Relay").is_none());
    }

    #[test]
    fn test_sensitivity_is_totally_ordered() {
        use Sensitivity::*;
        let tiers = [None, Low, Medium, High, VeryHigh, Extreme, Neo];
        for (i, lower) in tiers.iter().enumerate() {
            for higher in &tiers[i + 1..] {
                assert!(lower < higher, "{lower:?} should rank below {higher:?}");
            }
        }
        assert_eq!(Sensitivity::default(), High);
    }

    #[test]
    fn test_canonical_field_names() {
        let mut envelope = Envelope::document();
        envelope.set_sensitivity(Sensitivity::Medium);
        envelope.set_action(Action::Add);
        envelope.set_client(9);
        envelope.set_reply_to_client(true);
        envelope.set_client_reply_action("render");
        envelope.set_url("magnet:?xt=urn:btih:abc");
        envelope.set_command_path("/bus/restart");
        envelope.set_multipart(Multipart::new());
        envelope.add_route("keyring", "sign");
        envelope.next_route();
        envelope.set_header("User-Agent", "shadow/0.1");

        let map = envelope.to_map();
        for field in [
            "id",
            "external",
            "dynamicRoutingSlip",
            "route",
            "did",
            "client",
            "replyToClient",
            "clientReplyAction",
            "url",
            "multipart",
            "action",
            "commandPath",
            "headers",
            "message",
            "sensitivity",
        ] {
            assert!(map.contains_key(field), "missing canonical field {field}");
        }
    }

    #[test]
    fn test_round_trip_resumes_the_itinerary() {
        let registry = WireRegistry::with_defaults();

        let mut envelope = Envelope::text();
        envelope.set_sensitivity(Sensitivity::Extreme);
        envelope.set_action(Action::View);
        envelope.set_client(31);
        envelope.set_reply_to_client(true);
        envelope.set_url("http://localhost:8000/status");
        envelope.add_route("keyring", "sign");
        envelope.add_route("tor", "relay");
        envelope.add_route("email", "send");
        envelope.next_route();
        {
            let did = envelope.did();
            let mut did = did.write();
            did.set_alias("anna");
            did.set_passphrase("plaintext stays home");
            did.set_passphrase_hash("pbkdf2-sha1$2048$c2FsdA$aGFzaA");
        }
        envelope.payload().write().add_error_message("first relay down");

        let map = envelope.to_map();
        let mut back = Envelope::from_map(&map, &registry).unwrap();

        assert_eq!(back.id(), envelope.id());
        assert_eq!(back.sensitivity(), Sensitivity::Extreme);
        assert_eq!(back.action(), Some(Action::View));
        assert_eq!(back.client(), 31);
        assert!(back.reply_to_client());
        assert_eq!(back.url(), Some("http://localhost:8000/status"));
        assert_eq!(back.route().unwrap().service(), "keyring");
        assert_eq!(back.payload().read().error_messages(), ["first relay down"]);
        {
            let did = back.did();
            let did = did.read();
            assert_eq!(did.alias(), Some("anna"));
            assert!(did.passphrase().is_none());
        }

        // The itinerary resumes at hop two, not from the start.
        let resumed = back.next_route().unwrap();
        assert_eq!(resumed.service(), "tor");
        assert_eq!(back.next_route().unwrap().service(), "email");
        assert!(back.next_route().is_none());
    }

    #[test]
    fn test_from_map_requires_an_id() {
        let registry = WireRegistry::with_defaults();
        let map = WireMap::new();
        assert!(matches!(
            Envelope::from_map(&map, &registry),
            Err(WireError::MissingField { field: "id" })
        ));
    }

    #[test]
    fn test_bad_message_is_dropped_but_siblings_hydrate() {
        let registry = WireRegistry::with_defaults();
        let mut envelope = Envelope::document();
        envelope.set_client(55);
        let mut map = envelope.to_map();
        if let Some(Value::Object(message)) = map.get_mut("message") {
            message.insert("type".into(), Value::from("HologramMessage"));
        }

        let back = Envelope::from_map(&map, &registry).unwrap();
        assert!(back.payload().read().is_none());
        assert_eq!(back.client(), 55);
    }

    #[test]
    fn test_bad_slip_is_dropped_but_siblings_hydrate() {
        let registry = WireRegistry::with_defaults();
        let envelope = Envelope::document();
        envelope.add_route("keyring", "sign");
        let mut map = envelope.to_map();
        if let Some(Value::Object(slip)) = map.get_mut("dynamicRoutingSlip") {
            if let Some(Value::Array(routes)) = slip.get_mut("routes") {
                if let Some(Value::Object(entry)) = routes.get_mut(0) {
                    entry.remove("service");
                }
            }
        }

        let back = Envelope::from_map(&map, &registry).unwrap();
        assert!(back.slip().read().is_empty());
        assert!(back.payload().read().document().is_some());
    }

    #[test]
    fn test_json_text_round_trip() {
        let registry = WireRegistry::with_defaults();
        let envelope = Envelope::command();
        let json = envelope.to_json();
        let back = Envelope::from_json(&json, &registry).unwrap();
        assert_eq!(back, envelope);
        assert!(back.payload().read().command().is_some());
    }

    #[test]
    fn test_string_spelled_scalars_hydrate() {
        let registry = WireRegistry::with_defaults();
        let mut map = WireMap::new();
        map.insert("id".into(), Value::from("12345"));
        map.insert("external".into(), Value::from("true"));
        map.insert("client".into(), Value::from("67"));

        let envelope = Envelope::from_map(&map, &registry).unwrap();
        assert_eq!(envelope.id(), 12_345);
        assert!(envelope.external());
        assert_eq!(envelope.client(), 67);
    }
}
