//! Stored records tagged by shape.
//!
//! Records are opaque JSON; the only thing the engine needs from them is a
//! modification time for staleness decisions. Each shape knows where its
//! time lives. Generic records fall back to probing the usual field names.

use portkit_types::RecordTimestamp;
use serde_json::Value;

use crate::RecordShape;

/// Field names probed, in order, for a record's modification time.
const TIMESTAMP_FIELDS: [&str; 5] = ["timestamp", "lastUpdate", "updatedAt", "createdAt", "date"];

/// A stored value viewed through its declared shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record<'a> {
    Conversations(&'a Value),
    PersonaMap(&'a Value),
    TemplateList(&'a Value),
    Generic(&'a Value),
}

impl<'a> Record<'a> {
    /// Tags a value with the shape its descriptor declares.
    pub fn new(shape: RecordShape, value: &'a Value) -> Self {
        match shape {
            RecordShape::ConversationList => Record::Conversations(value),
            RecordShape::PersonaMap => Record::PersonaMap(value),
            RecordShape::TemplateList => Record::TemplateList(value),
            RecordShape::Generic => Record::Generic(value),
        }
    }

    /// The underlying value.
    pub fn value(&self) -> &'a Value {
        match *self {
            Record::Conversations(v)
            | Record::PersonaMap(v)
            | Record::TemplateList(v)
            | Record::Generic(v) => v,
        }
    }

    /// The record's modification time, or [`RecordTimestamp::ZERO`].
    pub fn timestamp(&self) -> RecordTimestamp {
        match *self {
            // The most recent conversation/template is the last element.
            Record::Conversations(v) | Record::TemplateList(v) => match v {
                Value::Array(items) => items.last().map(item_timestamp).unwrap_or_default(),
                other => item_timestamp(other),
            },
            // Personas are keyed by id; the map is as new as its newest entry.
            Record::PersonaMap(v) => match v {
                Value::Object(map) => map
                    .values()
                    .map(item_timestamp)
                    .max()
                    .unwrap_or_default(),
                other => item_timestamp(other),
            },
            Record::Generic(v) => item_timestamp(v),
        }
    }
}

/// Extracts a modification time from an arbitrary JSON value.
///
/// Objects are probed for `timestamp`, `lastUpdate`, `updatedAt`, `createdAt`
/// and `date`, in that order; an object without any of them that carries a
/// `messages` list takes the time of its last message. Lists take the time of
/// their last element. Anything else has no time.
pub fn item_timestamp(value: &Value) -> RecordTimestamp {
    match value {
        Value::Object(map) => {
            for field in TIMESTAMP_FIELDS {
                if let Some(ts) = map.get(field).and_then(RecordTimestamp::from_json) {
                    return ts;
                }
            }
            match map.get("messages") {
                Some(Value::Array(messages)) => {
                    messages.last().map(item_timestamp).unwrap_or_default()
                }
                _ => RecordTimestamp::ZERO,
            }
        }
        Value::Array(items) => items.last().map(item_timestamp).unwrap_or_default(),
        _ => RecordTimestamp::ZERO,
    }
}
