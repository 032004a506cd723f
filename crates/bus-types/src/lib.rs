//! # Bus Types Crate
//!
//! This crate contains the envelope, identity, routing, and payload types
//! shared by every service on the bus, plus the canonical map-form codec.
//!
//! ## Design Principles
//!
//! - **Single Unit of Work**: The [`Envelope`] is the sole carrier for work
//!   crossing the bus; services communicate only by mutating it.
//! - **Registry over Reflection**: Polymorphic wire fields are rebuilt
//!   through an explicit [`wire::WireRegistry`]; no type is ever resolved
//!   from a language-level class path.
//! - **Data Plane Only**: Nothing in this crate performs I/O, scheduling,
//!   or network cryptography. Dispatchers and transports live elsewhere.

pub mod accessor;
pub mod content;
pub mod did;
pub mod envelope;
pub mod ids;
pub mod message;
pub mod multipart;
pub mod route;
pub mod service;
pub mod wire;

pub use content::Content;
pub use did::{Did, DidStatus, Peer, PublicKeyRecord};
pub use envelope::{Action, Envelope, EnvelopeFactory, Sensitivity};
pub use ids::{CounterIdSource, IdSource, RandomIdSource};
pub use message::{
    CommandMessage, DocumentMessage, EventMessage, EventType, Payload, TextMessage,
};
pub use multipart::Multipart;
pub use route::{DynamicRoutingSlip, Route, RouteHandle, SimpleRoute};
pub use service::{BusService, ServiceDirectory, ServiceError, ServiceHandle};
pub use wire::{MapForm, WireError, WireMap, WireRegistry};
