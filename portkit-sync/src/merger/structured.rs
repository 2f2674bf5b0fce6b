//! Item-level reconciliation for structured record families.
//!
//! Replacing a whole conversation list or template list because one entry
//! changed would discard unrelated entries on the other side. These merges
//! work entry by entry instead, keyed by each entry's `id`.

use portkit_model::{RecordShape, item_timestamp};
use portkit_types::RecordTimestamp;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Entry-level events behind a structured merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EntryTally {
    /// Equally new entries with different content, resolved for the import.
    pub ties: usize,
    /// Imported entries refused because a built-in preset is involved.
    pub protected: usize,
    /// Imported entries refused because the local entry is newer.
    pub local_newer: usize,
}

/// Merges two values of a structured shape.
///
/// Returns `None` when the shape is generic or either side does not have the
/// expected JSON form; the caller then treats the record as opaque.
pub(crate) fn merge_structured(
    shape: RecordShape,
    local: &Value,
    imported: &Value,
    now: RecordTimestamp,
) -> Option<(Value, EntryTally)> {
    match (shape, local, imported) {
        (RecordShape::ConversationList, Value::Array(l), Value::Array(i)) => {
            let (merged, tally) = merge_conversations(l, i);
            Some((Value::Array(merged), tally))
        }
        (RecordShape::PersonaMap, Value::Object(l), Value::Object(i)) => {
            let (merged, tally) = merge_personas(l, i);
            Some((Value::Object(merged), tally))
        }
        (RecordShape::TemplateList, Value::Array(l), Value::Array(i)) => {
            let (merged, tally) = merge_templates(l, i, now);
            Some((Value::Array(merged), tally))
        }
        _ => None,
    }
}

/// Takes the imported value wholesale, except where that would touch a
/// built-in preset. Returns `None` for shapes that have no presets.
pub(crate) fn replace_structured(shape: RecordShape, local: &Value, imported: &Value) -> Option<(Value, EntryTally)> {
    match (shape, local, imported) {
        (RecordShape::PersonaMap, Value::Object(l), Value::Object(i)) => {
            let (merged, tally) = replace_personas(l, i);
            Some((Value::Object(merged), tally))
        }
        _ => None,
    }
}

/// Decides one overlapping entry: the import wins when it is newer, or
/// equally new with different content.
fn import_wins(
    local: &Value,
    imported: &Value,
    local_ts: RecordTimestamp,
    import_ts: RecordTimestamp,
    tally: &mut EntryTally,
) -> bool {
    if local == imported {
        return false;
    }
    if import_ts > local_ts {
        return true;
    }
    if import_ts == local_ts {
        tally.ties += 1;
        return true;
    }
    tally.local_newer += 1;
    false
}

fn entry_id(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

// ── Conversations ────────────────────────────────────────────────

fn conversation_time(conversation: &Value) -> RecordTimestamp {
    conversation
        .get("lastUpdate")
        .and_then(RecordTimestamp::from_json)
        .unwrap_or_else(|| item_timestamp(conversation))
}

/// Union by id; overlapping conversations keep the later `lastUpdate`.
/// The result is ordered newest first.
pub(crate) fn merge_conversations(local: &[Value], imported: &[Value]) -> (Vec<Value>, EntryTally) {
    let mut tally = EntryTally::default();
    let mut merged = local.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .filter_map(|(i, c)| entry_id(c).map(|id| (id, i)))
        .collect();

    for conversation in imported {
        match entry_id(conversation) {
            Some(id) => match index.get(&id) {
                Some(&i) => {
                    let current = &merged[i];
                    let (local_ts, import_ts) = (conversation_time(current), conversation_time(conversation));
                    if import_wins(current, conversation, local_ts, import_ts, &mut tally) {
                        merged[i] = conversation.clone();
                    }
                }
                None => {
                    index.insert(id, merged.len());
                    merged.push(conversation.clone());
                }
            },
            None => {
                if !merged.contains(conversation) {
                    merged.push(conversation.clone());
                }
            }
        }
    }

    merged.sort_by_key(|c| std::cmp::Reverse(conversation_time(c)));
    (merged, tally)
}

// ── Personas ─────────────────────────────────────────────────────

fn is_custom(persona: &Value) -> bool {
    persona
        .get("isCustom")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// True when `persona` may not be written over `existing`: either side is
/// a built-in preset. Refusals of a differing value are counted.
fn refused(existing: Option<&Value>, persona: &Value, tally: &mut EntryTally) -> bool {
    let blocked = !is_custom(persona) || existing.is_some_and(|e| !is_custom(e));
    if blocked && existing != Some(persona) {
        tally.protected += 1;
    }
    blocked
}

/// Merges only user-created personas. Built-in presets on either side are
/// never overwritten or added by an import.
pub(crate) fn merge_personas(
    local: &Map<String, Value>,
    imported: &Map<String, Value>,
) -> (Map<String, Value>, EntryTally) {
    let mut tally = EntryTally::default();
    let mut merged = local.clone();
    for (id, persona) in imported {
        if refused(merged.get(id), persona, &mut tally) {
            continue;
        }
        let replace = match merged.get(id) {
            Some(existing) => import_wins(
                existing,
                persona,
                item_timestamp(existing),
                item_timestamp(persona),
                &mut tally,
            ),
            None => true,
        };
        if replace {
            merged.insert(id.clone(), persona.clone());
        }
    }
    (merged, tally)
}

/// The imported custom personas replace the local ones; local built-in
/// presets stay as they are.
pub(crate) fn replace_personas(
    local: &Map<String, Value>,
    imported: &Map<String, Value>,
) -> (Map<String, Value>, EntryTally) {
    let mut tally = EntryTally::default();
    let mut merged: Map<String, Value> = local
        .iter()
        .filter(|(_, p)| !is_custom(p))
        .map(|(id, p)| (id.clone(), p.clone()))
        .collect();
    for (id, persona) in imported {
        if !refused(merged.get(id), persona, &mut tally) {
            merged.insert(id.clone(), persona.clone());
        }
    }
    (merged, tally)
}

// ── Templates ────────────────────────────────────────────────────

const IMPORTED_SUFFIX: &str = " (imported)";

/// Compares two templates ignoring identity fields.
fn same_body(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            let strip = |m: &Map<String, Value>| -> Map<String, Value> {
                m.iter()
                    .filter(|(k, _)| k.as_str() != "id" && k.as_str() != "name")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            };
            strip(a) == strip(b)
        }
        _ => a == b,
    }
}

/// `{base}_{now}`, with a counter appended if that id is already taken.
fn fresh_id(merged: &[Value], base: &str, now: RecordTimestamp) -> String {
    let taken = |candidate: &str| merged.iter().any(|t| entry_id(t).as_deref() == Some(candidate));
    let stem = format!("{base}_{}", now.millis());
    if !taken(&stem) {
        return stem;
    }
    (2u32..)
        .map(|n| format!("{stem}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(stem)
}

/// Union by id. An imported template whose name is already used by a
/// different local template is added under a new id and a suffixed name
/// rather than overwriting anything. Entries that came from the same import
/// never count as a name clash, so re-importing a file is a no-op.
pub(crate) fn merge_templates(
    local: &[Value],
    imported: &[Value],
    now: RecordTimestamp,
) -> (Vec<Value>, EntryTally) {
    let mut tally = EntryTally::default();
    let mut merged = local.to_vec();

    for template in imported {
        let id = entry_id(template);
        let name = entry_name(template);

        if let Some(name) = name {
            let renamed = format!("{name}{IMPORTED_SUFFIX}");
            let already_imported = merged
                .iter()
                .any(|t| entry_name(t) == Some(renamed.as_str()) && same_body(t, template));
            if already_imported {
                continue;
            }

            let name_clash = merged
                .iter()
                .any(|t| entry_name(t) == Some(name) && entry_id(t) != id && !imported.contains(t));
            if name_clash {
                let mut copy = template.clone();
                if let Value::Object(fields) = &mut copy {
                    let new_id = fresh_id(&merged, id.as_deref().unwrap_or("template"), now);
                    fields.insert("id".into(), Value::String(new_id));
                    fields.insert("name".into(), Value::String(renamed));
                }
                merged.push(copy);
                continue;
            }
        }

        let same_id = id
            .as_ref()
            .and_then(|id| merged.iter().position(|t| entry_id(t).as_ref() == Some(id)));
        match same_id {
            Some(i) => {
                let current = &merged[i];
                let (local_ts, import_ts) = (item_timestamp(current), item_timestamp(template));
                if import_wins(current, template, local_ts, import_ts, &mut tally) {
                    merged[i] = template.clone();
                }
            }
            None => {
                if !merged.contains(template) {
                    merged.push(template.clone());
                }
            }
        }
    }
    (merged, tally)
}
