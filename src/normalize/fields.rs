//! Per-field transforms for raw listing items
//!
//! Every transform is a plain function from the raw string to a new JSON value.
//! They are composed uniformly through [`apply_transform`], which turns a
//! failure into [`FieldOutcome::Kept`] so the caller always has a value to store.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Path segment of the thumbnail path holding the thumbnail file name
const THUMB_SEGMENT: usize = 4;

/// Length of the image extension stripped from the thumbnail file name (".png")
const THUMB_SUFFIX_CHARS: usize = 4;

/// Path segment of the program URL holding the program identifier
const URL_SEGMENT: usize = 5;

/// Separator between the namespace and the bare author id ("kaid_123")
const AUTHOR_DELIMITER: char = '_';

/// Result of applying one transform to one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// The field was transformed into a new value
    Transformed(Value),

    /// The transform failed; the raw value is kept unchanged
    Kept { raw: Value, reason: String },

    /// The item does not carry this field
    Absent,
}

/// A named transform applied to one raw field
#[derive(Debug, Clone, Copy)]
pub struct FieldTransform {
    pub field: &'static str,
    pub apply: fn(&str) -> Result<Value, String>,
}

/// All transforms applied by the normalizer, keyed by raw field name
pub const FIELD_TRANSFORMS: &[FieldTransform] = &[
    FieldTransform {
        field: "thumb",
        apply: thumbnail_id,
    },
    FieldTransform {
        field: "url",
        apply: program_id,
    },
    FieldTransform {
        field: "created",
        apply: created_timestamp,
    },
    FieldTransform {
        field: "authorKaid",
        apply: author_id,
    },
];

/// Applies `transform` to the raw value of its field
pub fn apply_transform(transform: &FieldTransform, raw: Option<&Value>) -> FieldOutcome {
    let Some(raw) = raw else {
        return FieldOutcome::Absent;
    };

    let Some(text) = raw.as_str() else {
        return FieldOutcome::Kept {
            raw: raw.clone(),
            reason: format!("expected a string, got {}", json_kind(raw)),
        };
    };

    match (transform.apply)(text) {
        Ok(value) => FieldOutcome::Transformed(value),
        Err(reason) => FieldOutcome::Kept {
            raw: raw.clone(),
            reason,
        },
    }
}

/// `/computer-programming/name/123/456.png` -> `456`
pub fn thumbnail_id(path: &str) -> Result<Value, String> {
    let file = path_segment(path, THUMB_SEGMENT)?;

    // Byte offset of the first character of the suffix
    let cut = file
        .char_indices()
        .rev()
        .nth(THUMB_SUFFIX_CHARS - 1)
        .map(|(index, _)| index)
        .filter(|index| *index > 0)
        .ok_or_else(|| format!("thumbnail name '{}' is too short", file))?;

    Ok(Value::String(file[..cut].to_string()))
}

/// `https://host/computer-programming/name/123` -> `123`
pub fn program_id(url: &str) -> Result<Value, String> {
    path_segment(url, URL_SEGMENT).map(|segment| Value::String(segment.to_string()))
}

/// Parses the creation date into a UTC timestamp with millisecond precision
pub fn created_timestamp(created: &str) -> Result<Value, String> {
    let parsed = DateTime::parse_from_rfc3339(created)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|naive| naive.and_utc())
        })
        .map_err(|e| format!("unparseable date '{}': {}", created, e))?;

    Ok(Value::String(
        parsed.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

/// `kaid_123456` -> `123456`
pub fn author_id(kaid: &str) -> Result<Value, String> {
    match kaid.split_once(AUTHOR_DELIMITER) {
        Some((_, id)) if !id.is_empty() => Ok(Value::String(id.to_string())),
        _ => Err(format!(
            "author '{}' has no '{}'-separated id",
            kaid, AUTHOR_DELIMITER
        )),
    }
}

fn path_segment(path: &str, index: usize) -> Result<&str, String> {
    path.split('/')
        .nth(index)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| format!("'{}' has no path segment {}", path, index))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
