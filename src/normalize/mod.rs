//! Record normalization
//!
//! Maps one raw listing item into the persisted [`Record`] shape. Each field
//! transform is guarded on its own: a malformed field is logged and left as
//! its raw value, the rest of the item is still transformed, and the item is
//! never dropped because of a single bad field.

mod fields;

pub use fields::{
    apply_transform, author_id, created_timestamp, program_id, thumbnail_id, FieldOutcome,
    FieldTransform, FIELD_TRANSFORMS,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw item as received from the listing: field name to JSON value
pub type RawItem = Map<String, Value>;

/// Fields never persisted: per-user flags, internal keys and translations
pub const EXCLUDED_FIELDS: &[&str] = &["flaggedByUser", "key", "translatedTitle"];

/// Field whose normalized value identifies a program across pages
pub const IDENTIFIER_FIELD: &str = "url";

/// A normalized, persisted listing item
///
/// Serialized as a plain JSON object; field order is not significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The program identifier, if the record carries one as a string
    pub fn identifier(&self) -> Option<&str> {
        self.0.get(IDENTIFIER_FIELD).and_then(Value::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Normalizes one raw item into a record
///
/// This never fails: transform errors are reported through `tracing` at
/// debug level and the affected field keeps its raw value.
pub fn normalize(mut item: RawItem) -> Record {
    for transform in FIELD_TRANSFORMS {
        match apply_transform(transform, item.get(transform.field)) {
            FieldOutcome::Transformed(value) => {
                item.insert(transform.field.to_string(), value);
            }
            FieldOutcome::Kept { reason, .. } => {
                tracing::debug!(
                    field = transform.field,
                    item = %item_label(&item),
                    "Keeping raw value: {}",
                    reason
                );
            }
            FieldOutcome::Absent => {
                tracing::trace!(field = transform.field, "Field absent, nothing to transform");
            }
        }
    }

    for field in EXCLUDED_FIELDS {
        item.remove(*field);
    }

    Record(item)
}

/// Normalizes a listing entry that is expected to be a JSON object
///
/// Returns `None` for entries that are not objects at all; there is no field
/// mapping to preserve in that case.
pub fn normalize_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(item) => Some(normalize(item)),
        other => {
            tracing::warn!("Skipping listing entry that is not an object: {}", other);
            None
        }
    }
}

fn item_label(item: &RawItem) -> String {
    item.get("url")
        .or_else(|| item.get("title"))
        .map(|value| value.to_string())
        .unwrap_or_else(|| "<unnamed>".to_string())
}
