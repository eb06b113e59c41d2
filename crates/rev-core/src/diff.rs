//! Sparse diffing of attribute sets.
//!
//! `diff` walks the keys of `current` and keeps every non-excluded attribute
//! whose value differs from `previous`, mapped to its **previous** value. The
//! result says what each changed attribute *was*; the row itself already
//! holds what it became.
//!
//! Values are compared whole. Nested arrays and objects are not merged or
//! diffed structurally.
//!
//! Keys present only in `previous` are not reported: iteration is driven by
//! `current`, so an attribute removed between the two states leaves no trace.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::Record;

/// Compute the sparse change set between `previous` and `current`.
///
/// A key missing from `previous` compares as `null`.
#[must_use]
pub fn diff(previous: &Record, current: &Record, excluded: &BTreeSet<String>) -> Record {
    current
        .iter()
        .filter(|(key, _)| !excluded.contains(key.as_str()))
        .filter_map(|(key, now)| {
            let before = previous.get(key).unwrap_or(&Value::Null);
            (before != now).then(|| (key.clone(), before.clone()))
        })
        .collect()
}

/// Restrict `row` to the declared `fields`, skipping excluded ones.
///
/// Used for predicate-driven mutations where no per-row prior state is
/// handed over: every declared field is reported with its stored value,
/// whether or not the mutation will change it.
#[must_use]
pub fn declared_fields(row: &Record, fields: &[String], excluded: &BTreeSet<String>) -> Record {
    fields
        .iter()
        .filter(|f| !excluded.contains(f.as_str()))
        .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}
