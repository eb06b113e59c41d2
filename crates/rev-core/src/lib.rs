//! # rev-core
//!
//! Core types and pure algorithms for revision tracking.
//!
//! This crate holds everything that does not touch a database:
//! - Entity schema model (attributes, column types, constraints)
//! - History schema derivation for shadow entities
//! - Sparse diffing between prior and current attribute sets
//! - The single-slot author register
//! - The `Revision` entity and its shadow-row encoding
//! - Row predicates used by bulk mutations
//!
//! Persistence, hooks, and orchestration live in `rev-db`.

pub mod author;
pub mod derive;
pub mod diff;
pub mod enums;
pub mod errors;
pub mod predicate;
pub mod revision;
pub mod schema;

/// An attribute set keyed by attribute name (not column name).
pub type Record = serde_json::Map<String, serde_json::Value>;
