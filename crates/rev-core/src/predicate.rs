//! Row predicates for predicate-driven (bulk) mutations.
//!
//! A `Predicate` is a conjunction of simple clauses over attribute names.
//! An empty predicate matches every row.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

impl Clause {
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Eq(attr, _) | Self::In(attr, _) | Self::IsNull(attr) => attr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    /// Matches every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(attribute.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(
        mut self,
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.clauses.push(Clause::In(
            attribute.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn is_null(mut self, attribute: impl Into<String>) -> Self {
        self.clauses.push(Clause::IsNull(attribute.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
