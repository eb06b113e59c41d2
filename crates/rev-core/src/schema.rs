//! Entity schema model.
//!
//! A host describes each entity type as an [`EntitySchema`]: a table, an
//! identity attribute, and an ordered list of [`AttributeDef`]s. Attribute
//! names are what records are keyed by; `field` is the backing column name.

use std::collections::{BTreeSet, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ColumnType, ConstraintKind};
use crate::errors::CoreError;

/// A constraint-like property of an attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Unique,
    PrimaryKey,
    AutoIncrement,
    /// Literal default applied by the store when the value is omitted.
    DefaultValue(serde_json::Value),
    /// SQL expression evaluated by the store (e.g. `CURRENT_TIMESTAMP`).
    Computed(String),
    References { table: String, column: String },
}

impl Constraint {
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        match self {
            Self::Unique => ConstraintKind::Unique,
            Self::PrimaryKey => ConstraintKind::PrimaryKey,
            Self::AutoIncrement => ConstraintKind::AutoIncrement,
            Self::DefaultValue(_) => ConstraintKind::DefaultValue,
            Self::Computed(_) => ConstraintKind::Computed,
            Self::References { .. } => ConstraintKind::References,
        }
    }
}

/// One attribute of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttributeDef {
    pub name: String,
    /// Column name; defaults to `name`.
    pub field: String,
    pub column_type: ColumnType,
    pub allow_null: bool,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl AttributeDef {
    /// A nullable, unconstrained attribute stored in a column of the same name.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            column_type,
            allow_null: true,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Integer primary key with auto-increment, the usual surrogate key.
    #[must_use]
    pub fn surrogate_key(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
            .not_null()
            .constraint(Constraint::PrimaryKey)
            .constraint(Constraint::AutoIncrement)
    }

    #[must_use]
    pub fn has(&self, kind: ConstraintKind) -> bool {
        self.constraints.iter().any(|c| c.kind() == kind)
    }

    /// Copy of this definition without any constraint whose kind is in `strip`.
    #[must_use]
    pub fn stripped(&self, strip: &BTreeSet<ConstraintKind>) -> Self {
        Self {
            constraints: self
                .constraints
                .iter()
                .filter(|c| !strip.contains(&c.kind()))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Schema of an entity type as registered with a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySchema {
    pub name: String,
    pub table: String,
    /// Name of the identity attribute.
    pub identity: String,
    pub attributes: Vec<AttributeDef>,
}

impl EntitySchema {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identity: identity.into(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn attribute(mut self, def: AttributeDef) -> Self {
        self.attributes.push(def);
        self
    }

    /// Check the schema is well formed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingIdentity` if the identity attribute is not
    /// declared, `CoreError::DuplicateAttribute` if a name or column repeats,
    /// and `CoreError::Validation` for empty names.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() || self.table.is_empty() {
            return Err(CoreError::Validation(
                "entity name and table must not be empty".into(),
            ));
        }

        let mut names = HashSet::new();
        let mut fields = HashSet::new();
        for attr in &self.attributes {
            if !names.insert(attr.name.as_str()) {
                return Err(CoreError::DuplicateAttribute {
                    entity: self.name.clone(),
                    attribute: attr.name.clone(),
                });
            }
            if !fields.insert(attr.field.as_str()) {
                return Err(CoreError::DuplicateAttribute {
                    entity: self.name.clone(),
                    attribute: attr.field.clone(),
                });
            }
        }

        if self.identity_attribute().is_none() {
            return Err(CoreError::MissingIdentity {
                entity: self.name.clone(),
                identity: self.identity.clone(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn identity_attribute(&self) -> Option<&AttributeDef> {
        self.get(&self.identity)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}
