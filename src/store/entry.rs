//! Store entry classification
//!
//! A store file is a JSON array of records optionally followed by a single
//! `{"cursor": "<token>"}` checkpoint. This module splits a parsed array into
//! its records and whatever trails them.

use crate::normalize::Record;
use crate::state::ContinuationToken;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Key of the single field carried by a checkpoint entry
pub const CHECKPOINT_KEY: &str = "cursor";

/// Trailing resume marker of a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub cursor: ContinuationToken,
}

impl Checkpoint {
    pub fn new(cursor: Option<ContinuationToken>) -> Self {
        Self {
            cursor: cursor.unwrap_or_default(),
        }
    }

    /// The token to resume from; `None` means start of sequence
    pub fn token(&self) -> Option<ContinuationToken> {
        if self.cursor.is_empty() {
            None
        } else {
            Some(self.cursor.clone())
        }
    }
}

/// What follows the records of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailingEntry {
    /// A well-formed checkpoint
    Checkpoint(Checkpoint),

    /// The last element looks like a checkpoint but cannot be used
    Malformed(String),

    /// The last element is a record; the run that wrote it never checkpointed
    Missing,
}

/// An entry that could not be placed into the record/checkpoint layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    pub index: usize,
    pub reason: String,
}

/// Splits parsed store entries into records and the trailing entry
pub fn split_entries(entries: Vec<Value>) -> Result<(Vec<Record>, TrailingEntry), EntryError> {
    let last_index = entries.len().saturating_sub(1);
    let mut records = Vec::with_capacity(entries.len());
    let mut trailing = TrailingEntry::Missing;

    for (index, entry) in entries.into_iter().enumerate() {
        let is_last = index == last_index;

        match entry {
            Value::Object(fields) if is_checkpoint_shaped(&fields) => {
                if !is_last {
                    return Err(EntryError {
                        index,
                        reason: "checkpoint entry before the end of the store".to_string(),
                    });
                }
                trailing = match fields.get(CHECKPOINT_KEY) {
                    Some(Value::String(cursor)) => TrailingEntry::Checkpoint(Checkpoint {
                        cursor: cursor.clone(),
                    }),
                    Some(other) => {
                        TrailingEntry::Malformed(format!("checkpoint cursor is not a string: {}", other))
                    }
                    None => TrailingEntry::Malformed("checkpoint has no cursor".to_string()),
                };
            }
            Value::Object(fields) => records.push(Record::from(fields)),
            other if is_last => {
                trailing = TrailingEntry::Malformed(format!(
                    "last entry is neither a record nor a checkpoint: {}",
                    other
                ));
            }
            other => {
                return Err(EntryError {
                    index,
                    reason: format!("entry is not an object: {}", other),
                });
            }
        }
    }

    Ok((records, trailing))
}

fn is_checkpoint_shaped(fields: &serde_json::Map<String, Value>) -> bool {
    fields.len() == 1 && fields.contains_key(CHECKPOINT_KEY)
}

/// Borrowed view serialized as the on-disk JSON array
pub(crate) struct StoreView<'a> {
    pub records: &'a [Record],
    pub checkpoint: Option<&'a Checkpoint>,
}

impl Serialize for StoreView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.records.len() + usize::from(self.checkpoint.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        for record in self.records {
            seq.serialize_element(record)?;
        }
        if let Some(checkpoint) = self.checkpoint {
            seq.serialize_element(checkpoint)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_split_with_checkpoint() {
        let (records, trailing) =
            split_entries(entries(json!([{"title": "a"}, {"title": "b"}, {"cursor": "T"}])))
                .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            trailing,
            TrailingEntry::Checkpoint(Checkpoint {
                cursor: "T".to_string()
            })
        );
    }

    #[test]
    fn test_split_without_checkpoint() {
        let (records, trailing) = split_entries(entries(json!([{"title": "a"}]))).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(trailing, TrailingEntry::Missing);
    }

    #[test]
    fn test_split_malformed_checkpoint() {
        let (records, trailing) =
            split_entries(entries(json!([{"title": "a"}, {"cursor": 12}]))).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(trailing, TrailingEntry::Malformed(_)));

        let (_, trailing) = split_entries(entries(json!([{"title": "a"}, "junk"]))).unwrap();
        assert!(matches!(trailing, TrailingEntry::Malformed(_)));
    }

    #[test]
    fn test_split_rejects_inner_checkpoint() {
        let result = split_entries(entries(json!([{"cursor": "T"}, {"title": "a"}])));
        assert_eq!(result.unwrap_err().index, 0);
    }

    #[test]
    fn test_empty_cursor_means_start_of_sequence() {
        assert_eq!(Checkpoint::new(None).token(), None);
        assert_eq!(
            Checkpoint::new(Some("T".to_string())).token().as_deref(),
            Some("T")
        );
    }

    #[test]
    fn test_store_view_serializes_checkpoint_last() {
        let records = vec![Record::from(
            json!({"title": "a"}).as_object().cloned().unwrap(),
        )];
        let checkpoint = Checkpoint::new(Some("T".to_string()));
        let view = StoreView {
            records: &records,
            checkpoint: Some(&checkpoint),
        };

        let text = serde_json::to_string(&view).unwrap();
        assert_eq!(text, r#"[{"title":"a"},{"cursor":"T"}]"#);
    }
}
