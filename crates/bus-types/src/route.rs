//! # Routes and the Dynamic Routing Slip
//!
//! A [`Route`] is one hop of an envelope's itinerary: which service, which
//! operation. The [`DynamicRoutingSlip`] is the itinerary itself: an ordered
//! sequence of routes plus a traversal cursor, consumed hop-by-hop by the
//! dispatcher.
//!
//! ## Traversal Rules
//!
//! - Routes come back in append order, each exactly once per traversal.
//! - Appending is legal mid-flight; the new hop queues behind the ones
//!   already ahead of the cursor.
//! - An exhausted slip answers `None` repeatedly, but an append reopens it:
//!   the next call resumes exactly where traversal left off.
//!
//! The cursor is advanced by one dispatcher at a time. Sharing a slip
//! between an envelope and its alias is expected; dispatching both
//! concurrently is not.

use crate::wire::{self, MapForm, WireError, WireMap, WireRegistry, TYPE_KEY};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One hop of an itinerary.
///
/// Implementations are immutable in service and operation once constructed;
/// only the routed flag moves, and it moves through a shared reference
/// because route handles are shared.
pub trait Route: Send + Sync + fmt::Debug {
    /// Identifier of the service this hop targets.
    fn service(&self) -> &str;

    /// Operation the service should perform.
    fn operation(&self) -> &str;

    /// Whether this hop has been dispatched.
    fn routed(&self) -> bool;

    /// Mark this hop dispatched (or not).
    fn set_routed(&self, routed: bool);

    /// Encode to the canonical map, `type` discriminator included.
    fn to_map(&self) -> WireMap;
}

/// Shared handle to a route. The slip and the envelope's route cache hold
/// the same allocation.
pub type RouteHandle = Arc<dyn Route>;

/// Shared handle to a slip. An envelope and its aliases hold the same slip.
pub type SharedSlip = Arc<RwLock<DynamicRoutingSlip>>;

// ==============================================================================
// SimpleRoute
// ==============================================================================

/// The standard service + operation route.
#[derive(Debug)]
pub struct SimpleRoute {
    service: String,
    operation: String,
    routed: AtomicBool,
}

impl SimpleRoute {
    /// Wire discriminator.
    pub const TYPE: &'static str = "SimpleRoute";

    /// Create a route targeting `service` / `operation`.
    #[must_use]
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            routed: AtomicBool::new(false),
        }
    }

    /// Create a shared handle directly.
    #[must_use]
    pub fn handle(service: impl Into<String>, operation: impl Into<String>) -> RouteHandle {
        Arc::new(Self::new(service, operation))
    }

    /// Rebuild from the canonical map.
    ///
    /// # Errors
    ///
    /// [`WireError::MissingField`] when `service` or `operation` is absent.
    pub fn from_map(map: &WireMap) -> Result<Self, WireError> {
        let service =
            wire::get_str(map, "service").ok_or(WireError::MissingField { field: "service" })?;
        let operation =
            wire::get_str(map, "operation").ok_or(WireError::MissingField {
                field: "operation",
            })?;
        let route = Self::new(service, operation);
        route
            .routed
            .store(wire::get_bool(map, "routed").unwrap_or(false), Ordering::Relaxed);
        Ok(route)
    }
}

impl Route for SimpleRoute {
    fn service(&self) -> &str {
        &self.service
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    fn routed(&self) -> bool {
        self.routed.load(Ordering::Relaxed)
    }

    fn set_routed(&self, routed: bool) {
        self.routed.store(routed, Ordering::Relaxed);
    }

    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(TYPE_KEY.into(), Value::from(Self::TYPE));
        map.insert("service".into(), Value::from(self.service.clone()));
        map.insert("operation".into(), Value::from(self.operation.clone()));
        if self.routed() {
            map.insert("routed".into(), Value::from(true));
        }
        map
    }
}

// ==============================================================================
// DynamicRoutingSlip
// ==============================================================================

/// Appendable FIFO itinerary with a traversal cursor.
pub struct DynamicRoutingSlip {
    /// Routes in append order. Entries are never removed; the cursor
    /// records progress instead, so a rehydrated slip resumes rather than
    /// restarts.
    routes: Vec<RouteHandle>,
    /// Index of the next route to hand out.
    cursor: usize,
    /// Whether traversal has begun.
    in_progress: bool,
}

impl DynamicRoutingSlip {
    /// Create an empty slip.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            cursor: 0,
            in_progress: false,
        }
    }

    /// Append a hop at the tail. Legal before and during traversal; an
    /// append after exhaustion reopens the slip.
    pub fn add_route(&mut self, route: RouteHandle) {
        if self.in_progress && self.is_complete() {
            debug!(
                "[Slip] Reopened by a hop to `{}` / `{}`",
                route.service(),
                route.operation()
            );
        }
        self.routes.push(route);
    }

    /// Mark traversal in progress. Idempotent; [`Self::next_route`] calls
    /// this on first use.
    pub fn start(&mut self) {
        if !self.in_progress {
            debug!("[Slip] Traversal started over {} hop(s)", self.routes.len());
        }
        self.in_progress = true;
    }

    /// Whether traversal has begun.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Hand out the next hop and advance the cursor.
    ///
    /// `None` once every current entry has been consumed; the cursor stays
    /// put, so the answer repeats until an append reopens the slip.
    pub fn next_route(&mut self) -> Option<RouteHandle> {
        if !self.in_progress {
            self.start();
        }
        let route = self.routes.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(route)
    }

    /// The hop most recently handed out, without advancing.
    #[must_use]
    pub fn current_route(&self) -> Option<RouteHandle> {
        if self.cursor == 0 {
            return None;
        }
        self.routes.get(self.cursor - 1).cloned()
    }

    /// The hop the next [`Self::next_route`] call would hand out.
    #[must_use]
    pub fn peek_next(&self) -> Option<RouteHandle> {
        self.routes.get(self.cursor).cloned()
    }

    /// True once the cursor has consumed every current entry. True for an
    /// empty slip that never started.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.routes.len()
    }

    /// Number of hops ever appended.
    #[must_use]
    pub fn number_of_routes(&self) -> usize {
        self.routes.len()
    }

    /// True when no hop was ever appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Rebuild from the canonical map.
    ///
    /// The cursor survives the wire: a rehydrated slip resumes its
    /// traversal. A route entry that cannot be rebuilt fails the whole
    /// slip, because silently dropping an entry would shift every
    /// position behind it and corrupt the cursor.
    ///
    /// # Errors
    ///
    /// Whatever [`WireRegistry::build_route`] reports for the offending
    /// entry, or [`WireError::WrongShape`] for a non-map entry.
    pub fn from_map(map: &WireMap, registry: &WireRegistry) -> Result<Self, WireError> {
        let mut routes: Vec<RouteHandle> = Vec::new();
        if let Some(entries) = wire::get_array(map, "routes") {
            for entry in entries {
                match entry {
                    Value::Object(m) => routes.push(registry.build_route(m)?),
                    other => {
                        return Err(WireError::WrongShape {
                            field: "routes".to_string(),
                            expected: "a map",
                            found: wire::shape_of(other),
                        })
                    }
                }
            }
        }
        let cursor = wire::get_i64(map, "cursor")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
            .min(routes.len());
        let in_progress = wire::get_bool(map, "inProgress").unwrap_or(cursor > 0);
        Ok(Self {
            routes,
            cursor,
            in_progress,
        })
    }
}

impl Default for DynamicRoutingSlip {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DynamicRoutingSlip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicRoutingSlip")
            .field("routes", &self.routes.len())
            .field("cursor", &self.cursor)
            .field("in_progress", &self.in_progress)
            .finish()
    }
}

impl MapForm for DynamicRoutingSlip {
    fn to_map(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(
            "routes".into(),
            Value::Array(
                self.routes
                    .iter()
                    .map(|r| Value::Object(r.to_map()))
                    .collect(),
            ),
        );
        map.insert("cursor".into(), Value::from(self.cursor as u64));
        if self.in_progress {
            map.insert("inProgress".into(), Value::from(true));
        }
        map
    }
}
