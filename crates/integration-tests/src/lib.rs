//! # Integration Tests Crate
//!
//! This crate exercises the bus kernel end to end: envelopes dispatched
//! through a simulated service pipeline, identities hashed and
//! authenticated with the bus-crypto strategies, and itineraries
//! serialized mid-flight and resumed on the other side.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs                # This file
//! │   ├── services.rs           # Sample services the simulated bus registers
//! │   └── runtime_simulation.rs # Dispatch loop + end-to-end tests
//! ```
//!
//! ## What Gets Exercised
//!
//! 1. **Full Pipeline**: store → relay → notify, including a hop appended
//!    mid-flight by a service
//! 2. **Degradation**: unknown services and refused operations are
//!    recorded on the envelope instead of aborting the itinerary
//! 3. **Identity**: passphrase hash and authenticate through the
//!    strategy registry, wrong passphrases included
//! 4. **Wire Resume**: an envelope serialized between hops resumes where
//!    it left off, not from the start
//! 5. **Concurrency**: trust flags flipped from many threads through one
//!    shared identity
//!
//! The dispatch loop here is deliberately minimal. It exists to exercise
//! the kernel types, not to be a dispatcher.

pub mod runtime_simulation;
pub mod services;
