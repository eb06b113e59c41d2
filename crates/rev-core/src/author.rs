//! The pending-author register.
//!
//! `AuthorContext` holds at most one pending author per tracked type. A
//! caller sets it before a mutation; the recorder for that mutation takes it,
//! which clears the slot. It is a single-use register, not a session.
//!
//! Mutations of the same type from concurrent requests share one slot and
//! race on it. Hosts that serve concurrent requests should pass the author
//! explicitly with the mutation instead of relying on the register.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifier of the acting author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AuthorId {
    Integer(i64),
    Text(String),
}

impl AuthorId {
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Integer(i) => (*i).into(),
            Self::Text(s) => s.clone().into(),
        }
    }

    /// Read an author from a stored value. `NULL` and other shapes yield `None`.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Integer),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for AuthorId {
    fn from(id: i64) -> Self {
        Self::Integer(id)
    }
}

impl From<&str> for AuthorId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for AuthorId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Pending author per tracked type name.
#[derive(Debug, Default)]
pub struct AuthorContext {
    slots: Mutex<HashMap<String, AuthorId>>,
}

impl AuthorContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `author` for `type_name`, replacing any pending value.
    pub fn set_author(&self, type_name: &str, author: impl Into<AuthorId>) {
        self.lock().insert(type_name.to_string(), author.into());
    }

    /// Return the pending author for `type_name` and clear the slot.
    pub fn take_author(&self, type_name: &str) -> Option<AuthorId> {
        self.lock().remove(type_name)
    }

    /// Return the pending author without clearing it.
    #[must_use]
    pub fn peek_author(&self, type_name: &str) -> Option<AuthorId> {
        self.lock().get(type_name).cloned()
    }

    // A panic while holding the lock cannot leave the map half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, AuthorId>> {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_slot() {
        let ctx = AuthorContext::new();
        ctx.set_author("Task", 42);
        assert_eq!(ctx.take_author("Task"), Some(AuthorId::Integer(42)));
        assert_eq!(ctx.take_author("Task"), None);
    }

    #[test]
    fn set_overwrites_pending_value() {
        let ctx = AuthorContext::new();
        ctx.set_author("Task", 1);
        ctx.set_author("Task", "ops-bot");
        assert_eq!(ctx.peek_author("Task"), Some(AuthorId::Text("ops-bot".into())));
    }

    #[test]
    fn slots_are_keyed_by_type() {
        let ctx = AuthorContext::new();
        ctx.set_author("Task", 1);
        assert_eq!(ctx.take_author("Project"), None);
        assert_eq!(ctx.take_author("Task"), Some(AuthorId::Integer(1)));
    }

    #[test]
    fn author_id_is_untagged_in_json() {
        assert_eq!(serde_json::to_string(&AuthorId::Integer(5)).unwrap(), "5");
        assert_eq!(
            serde_json::from_str::<AuthorId>("\"ana\"").unwrap(),
            AuthorId::Text("ana".into())
        );
        assert_eq!(AuthorId::from_value(&serde_json::Value::Null), None);
    }
}
