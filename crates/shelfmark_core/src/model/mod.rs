//! Domain model for the shelf forest.
//!
//! # Responsibility
//! - Define folder/item records shared by the tree engine and the store.
//! - Define the serializable read-only projection handed to rendering.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeId`.
//! - Model types carry no tree-structure logic; the `tree` module owns it.

pub mod node;
pub mod view;
