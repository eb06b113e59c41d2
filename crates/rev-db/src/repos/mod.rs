//! `LibsqlHost` data access, split by concern.
//!
//! - `rows`: insert and select for any registered entity
//! - `mutations`: hook-firing update/destroy, single and bulk

pub mod mutations;
pub mod rows;
