#![deny(missing_docs)]

//! # confab-core — Foundational Types for Confab
//!
//! This crate defines the pure transforms that the API layer is built on.
//! It has no internal crate dependencies — only `serde` and `serde_json`
//! from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **One wire shape.** Every response leaving the API, success or error,
//!    is an [`Envelope`]. The codec in [`envelope`] is the single place that
//!    shape is produced.
//!
//! 2. **Pure functions over shared state.** The envelope codec and the
//!    permission codename resolver are stateless transforms of their inputs.
//!    They hold no locks, perform no I/O, and are safe to call from any
//!    worker concurrently.
//!
//! 3. **Open permission namespace.** Capability identifiers are derived from
//!    resource-kind strings on demand — there is no registry to keep in sync
//!    and no unknown-kind error path.

pub mod envelope;
pub mod permissions;

// Re-export primary types at crate root for ergonomic imports.
pub use envelope::{default_message, encode, error_body, success_body, Envelope, Status};
pub use permissions::{codename, PermissionAction, PermissionCodenames};
