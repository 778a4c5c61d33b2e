//! Folder/item tree engine.
//!
//! # Responsibility
//! - Hold the forest as an id-indexed arena (`forest`).
//! - Locate, attach, detach and move nodes (`mutation`).
//! - Veto folder moves that would break acyclicity (`guard`).
//!
//! # Invariants
//! - Ids are unique across folders and items.
//! - No folder is its own descendant.
//! - Every non-root node has exactly one parent.

pub mod error;
pub mod forest;
pub mod guard;
pub mod mutation;
