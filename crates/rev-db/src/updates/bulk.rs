//! Bulk mutation options and builder.

use rev_core::Record;
use rev_core::author::AuthorId;
use rev_core::predicate::Predicate;

/// Options for `bulk_update` / `bulk_destroy`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOptions {
    pub predicate: Predicate,
    /// New values. Ignored by `bulk_destroy`.
    pub values: Record,
    /// Attributes declared as updated. Only these keys of `values` are
    /// written.
    pub fields: Vec<String>,
    /// Expand into per-row mutations that fire single-row hooks.
    pub individual_hooks: bool,
    pub author: Option<AuthorId>,
}

pub struct BulkMutationBuilder {
    options: BulkOptions,
    fields_declared: bool,
}

impl BulkMutationBuilder {
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            options: BulkOptions {
                predicate,
                ..BulkOptions::default()
            },
            fields_declared: false,
        }
    }

    #[must_use]
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.values.insert(attribute.into(), value.into());
        self
    }

    /// Declare the updated attributes explicitly instead of using every key
    /// passed to [`Self::set`].
    #[must_use]
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.options.fields = fields.into_iter().map(Into::into).collect();
        self.fields_declared = true;
        self
    }

    #[must_use]
    pub const fn individual_hooks(mut self, enabled: bool) -> Self {
        self.options.individual_hooks = enabled;
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<AuthorId>) -> Self {
        self.options.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn build(mut self) -> BulkOptions {
        if !self.fields_declared {
            self.options.fields = self.options.values.keys().cloned().collect();
        }
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn fields_default_to_value_keys() {
        let opts = BulkMutationBuilder::new(Predicate::all())
            .set("status", "done")
            .set("priority", 1)
            .build();
        assert_eq!(opts.fields, vec!["priority", "status"]);
        assert_eq!(opts.values["status"], json!("done"));
        assert!(!opts.individual_hooks);
    }

    #[test]
    fn declared_fields_win() {
        let opts = BulkMutationBuilder::new(Predicate::all())
            .set("status", "done")
            .fields(["status", "owner"])
            .individual_hooks(true)
            .author(9)
            .build();
        assert_eq!(opts.fields, vec!["status", "owner"]);
        assert!(opts.individual_hooks);
        assert_eq!(opts.author, Some(AuthorId::Integer(9)));
    }
}
