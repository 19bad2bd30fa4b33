//! # FNS Name-Service Contracts
//!
//! The name lifecycle, from a bare label to a registered, priced, optionally
//! fuse-locked name:
//!
//! - **Registry**: node → (owner, resolver, ttl). Every other component
//!   writes through it.
//! - **Root**: owns the registry root and hands out top-level labels.
//! - **Base registrar**: time-limited ownership of labels under one TLD, with
//!   a grace period after expiry.
//! - **Name wrapper**: holds registrar tokens and registry nodes on an
//!   owner's behalf, with burnable permission fuses.
//! - **Price oracle**: length-bucketed rent converted through a reference
//!   price feed.
//! - **Registration controller**: commit/reveal registration, renewal and
//!   fee withdrawal.
//! - **Collaborators**: payment token, resolvers, reverse registrar.
//! - **Name service**: owns all of the above and runs each operation
//!   atomically.
//!
//! ## Design Principles
//!
//! 1. Balances, prices and expiries use checked arithmetic.
//! 2. Components never call back into whoever called them; a caller lends
//!    out exactly the collaborators a call needs.
//! 3. Every check precedes the first write, and the service commits an
//!    operation's state only if the whole operation succeeds.
//! 4. Every stored type is serde-serializable for snapshots.

pub mod base_registrar;
pub mod context;
pub mod controller;
pub mod events;
pub mod fuses;
pub mod name_wrapper;
pub mod payment_token;
pub mod price_oracle;
pub mod registry;
pub mod resolver;
pub mod reverse_registrar;
pub mod root;
pub mod service;

pub use context::CallContext;
pub use controller::{ControllerError, RegistrationController, RegistrationRequest};
pub use events::Event;
pub use fuses::Fuses;
pub use service::{NameService, ServiceError};
