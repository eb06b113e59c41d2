//! The `Revision` entity and its shadow-row encoding.
//!
//! A revision is one persisted record of a single tracked instance's
//! pre-mutation values for the attributes that changed. On the shadow type
//! it is stored as:
//!
//! | attribute   | column         | content                               |
//! |-------------|----------------|---------------------------------------|
//! | `id`        | `id`           | surrogate key                         |
//! | `modelId`   | `fk_model_id`  | identity of the tracked instance      |
//! | `diff`      | `t_diff`       | JSON object of prior values           |
//! | `createdAt` | `i_created_at` | UTC epoch seconds                     |
//! | *author*    | *author field* | optional, when author tracking is on  |

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Record;
use crate::author::AuthorId;
use crate::errors::CoreError;

pub const ID: &str = "id";
pub const MODEL_ID: &str = "modelId";
pub const DIFF: &str = "diff";
pub const CREATED_AT: &str = "createdAt";

pub const ID_COLUMN: &str = "id";
pub const MODEL_ID_COLUMN: &str = "fk_model_id";
pub const DIFF_COLUMN: &str = "t_diff";
pub const CREATED_AT_COLUMN: &str = "i_created_at";

/// Attribute and column names reserved by the history layout.
pub const RESERVED_NAMES: [&str; 7] = [
    ID,
    MODEL_ID,
    DIFF,
    CREATED_AT,
    MODEL_ID_COLUMN,
    DIFF_COLUMN,
    CREATED_AT_COLUMN,
];

/// One captured mutation of a tracked instance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Revision {
    /// Surrogate key; `None` until persisted.
    pub id: Option<i64>,
    pub model_id: Option<serde_json::Value>,
    /// Sparse map of attribute name to its value before the mutation.
    pub diff: Record,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorId>,
}

impl Revision {
    /// Build an unsaved revision stamped with the current time, truncated to
    /// whole seconds.
    #[must_use]
    pub fn new(model_id: Option<serde_json::Value>, diff: Record, author: Option<AuthorId>) -> Self {
        Self {
            id: None,
            model_id,
            diff,
            created_at: now_seconds(),
            author,
        }
    }

    /// Encode as a shadow-type record.
    ///
    /// The author attribute is written only when `author_field` is set; `id`
    /// is omitted for unsaved revisions so the store assigns it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Serialization` if the diff cannot be encoded.
    pub fn to_record(&self, author_field: Option<&str>) -> Result<Record, CoreError> {
        let mut record = Record::new();
        if let Some(id) = self.id {
            record.insert(ID.into(), id.into());
        }
        record.insert(
            MODEL_ID.into(),
            self.model_id.clone().unwrap_or(serde_json::Value::Null),
        );
        record.insert(DIFF.into(), encode_diff(&self.diff)?.into());
        record.insert(CREATED_AT.into(), self.created_at.timestamp().into());
        if let Some(field) = author_field {
            record.insert(
                field.into(),
                self.author
                    .as_ref()
                    .map_or(serde_json::Value::Null, AuthorId::to_value),
            );
        }
        Ok(record)
    }

    /// Decode a shadow-type record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if a bookkeeping attribute is missing
    /// or has the wrong shape, and `CoreError::Serialization` if the diff is
    /// not a JSON object.
    pub fn from_record(record: &Record, author_field: Option<&str>) -> Result<Self, CoreError> {
        let id = record.get(ID).and_then(serde_json::Value::as_i64);
        let model_id = match record.get(MODEL_ID) {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(v.clone()),
        };
        let diff = match record.get(DIFF) {
            Some(serde_json::Value::String(s)) => decode_diff(s)?,
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => return Err(CoreError::Validation(format!("revision has no '{DIFF}'"))),
        };
        let secs = record
            .get(CREATED_AT)
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| CoreError::Validation(format!("revision has no '{CREATED_AT}'")))?;
        let created_at = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::Validation(format!("timestamp out of range: {secs}")))?;
        let author = author_field
            .and_then(|f| record.get(f))
            .and_then(AuthorId::from_value);

        Ok(Self {
            id,
            model_id,
            diff,
            created_at,
            author,
        })
    }
}

/// Serialize a sparse diff. An empty diff encodes as `{}`.
///
/// # Errors
///
/// Returns `CoreError::Serialization` if encoding fails.
pub fn encode_diff(diff: &Record) -> Result<String, CoreError> {
    Ok(serde_json::to_string(diff)?)
}

/// Parse a diff previously written by [`encode_diff`].
///
/// # Errors
///
/// Returns `CoreError::Serialization` if `s` is not a JSON object.
pub fn decode_diff(s: &str) -> Result<Record, CoreError> {
    Ok(serde_json::from_str(s)?)
}

fn now_seconds() -> DateTime<Utc> {
    let secs = Utc::now().timestamp();
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
