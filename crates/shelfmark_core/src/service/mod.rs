//! Session-level services.
//!
//! # Responsibility
//! - Combine forest, drag session and reconciler into one editing session.
//! - Keep UI/CLI layers decoupled from engine internals.

pub mod workspace;
