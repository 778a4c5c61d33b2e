//! Input-event sequencing for drag-and-drop reorganization.
//!
//! # Responsibility
//! - Translate pointer/keyboard drag events into previews and move commands.
//!
//! # Invariants
//! - Only one drag is active at a time.
//! - Cancellation is synchronous and restores the pre-drag placement.

pub mod drag;
