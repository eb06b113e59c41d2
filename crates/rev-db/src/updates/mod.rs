//! Option builders for predicate-driven mutations.
//!
//! A builder produces a plain options struct consumed by the host's bulk
//! mutation methods. Declared fields default to the keys of the values set.

pub mod bulk;
