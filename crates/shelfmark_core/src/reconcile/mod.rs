//! Optimistic mutation and reconciliation protocol.
//!
//! # Responsibility
//! - Describe user mutations as commands (`command`).
//! - Define the external store contract and timed persist call (`adapter`).
//! - Apply commands locally and roll back scoped failures (`reconciler`).
//!
//! # Invariants
//! - The forest is updated before the store answers.
//! - Rollback is per mutation, not per tree.

pub mod adapter;
pub mod command;
pub mod reconciler;
