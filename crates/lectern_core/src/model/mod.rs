//! Domain model for paginated reference content.
//!
//! # Responsibility
//! - Define canonical data structures shared by bundle, store, resolver and
//!   pager layers.
//! - Keep one unit-centric shape for both verse-like and record-like content.
//!
//! # Invariants
//! - Every content unit is identified by its natural key
//!   `(kind, parent_id, sequence)`; no surrogate ids exist.
//! - Units are immutable once created; import/sync paths replace, never edit.

pub mod catalog;
pub mod page;
pub mod position;
pub mod unit;
