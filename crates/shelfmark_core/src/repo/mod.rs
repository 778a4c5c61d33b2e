//! Durable storage implementations.
//!
//! # Responsibility
//! - Keep SQLite query details out of the tree engine and reconciler.
//! - Provide the `PersistenceAdapter` used to sync optimistic mutations.
//!
//! # Invariants
//! - Store writes re-validate hierarchy rules before touching rows.
//! - Store APIs return semantic errors (`NodeNotFound`, `CycleDetected`) in
//!   addition to DB transport errors.

pub mod node_store;
