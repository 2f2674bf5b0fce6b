use portkit_model::{Category, Record, RecordShape, Snapshot, item_timestamp};
use portkit_types::RecordTimestamp;
use pretty_assertions::assert_eq;
use serde_json::json;

fn ts(ms: i64) -> RecordTimestamp {
    RecordTimestamp::from_millis(ms)
}

// ── Generic probing ──────────────────────────────────────────────

#[test]
fn probes_fields_in_order() {
    let v = json!({"createdAt": 1, "updatedAt": 2, "lastUpdate": 3, "timestamp": 4});
    assert_eq!(item_timestamp(&v), ts(4));

    let v = json!({"createdAt": 1, "updatedAt": 2, "lastUpdate": 3});
    assert_eq!(item_timestamp(&v), ts(3));

    let v = json!({"createdAt": 1, "updatedAt": 2});
    assert_eq!(item_timestamp(&v), ts(2));

    let v = json!({"createdAt": 1});
    assert_eq!(item_timestamp(&v), ts(1));
}

#[test]
fn date_string_field() {
    let v = json!({"date": "2024-01-02"});
    assert_eq!(item_timestamp(&v), ts(1_704_153_600_000));
}

#[test]
fn unparseable_field_falls_through_to_next() {
    let v = json!({"timestamp": "soon", "createdAt": 7});
    assert_eq!(item_timestamp(&v), ts(7));
}

#[test]
fn list_uses_last_element() {
    let v = json!([{"timestamp": 5}, {"timestamp": 9}, {"timestamp": 1}]);
    assert_eq!(item_timestamp(&v), ts(1));
}

#[test]
fn conversation_without_fields_uses_last_message() {
    let v = json!({"id": "c1", "messages": [{"timestamp": 10}, {"timestamp": 20}]});
    assert_eq!(item_timestamp(&v), ts(20));
}

#[test]
fn own_field_beats_messages() {
    let v = json!({"lastUpdate": 99, "messages": [{"timestamp": 20}]});
    assert_eq!(item_timestamp(&v), ts(99));
}

#[test]
fn untimed_values_are_zero() {
    assert_eq!(item_timestamp(&json!("dark")), RecordTimestamp::ZERO);
    assert_eq!(item_timestamp(&json!(42)), RecordTimestamp::ZERO);
    assert_eq!(item_timestamp(&json!([])), RecordTimestamp::ZERO);
    assert_eq!(item_timestamp(&json!({"messages": []})), RecordTimestamp::ZERO);
}

// ── Shaped records ───────────────────────────────────────────────

#[test]
fn conversation_list_uses_last_conversation() {
    let v = json!([{"id": "a", "lastUpdate": 300}, {"id": "b", "lastUpdate": 100}]);
    assert_eq!(Record::new(RecordShape::ConversationList, &v).timestamp(), ts(100));
}

#[test]
fn persona_map_uses_newest_entry() {
    let v = json!({
        "general_assistant": {"name": "General"},
        "mine": {"name": "Mine", "isCustom": true, "updatedAt": 500},
        "other": {"name": "Other", "isCustom": true, "updatedAt": 200}
    });
    assert_eq!(Record::new(RecordShape::PersonaMap, &v).timestamp(), ts(500));
}

#[test]
fn template_list_uses_last_template() {
    let v = json!([{"id": "t1", "createdAt": 10}, {"id": "t2", "createdAt": 30}]);
    assert_eq!(Record::new(RecordShape::TemplateList, &v).timestamp(), ts(30));
}

#[test]
fn record_exposes_value() {
    let v = json!({"a": 1});
    assert_eq!(Record::new(RecordShape::Generic, &v).value(), &v);
}

// ── Snapshot ─────────────────────────────────────────────────────

#[test]
fn snapshot_counts_and_iteration() {
    let mut snap = Snapshot::new();
    snap.insert(Category::Settings, "ui_theme", json!("dark"));
    snap.insert(Category::Chat, "chat_conversations", json!([]));
    snap.insert(Category::Chat, "chat_personas", json!({}));

    assert_eq!(snap.len(), 3);
    let keys: Vec<&str> = snap.iter().map(|(_, k, _)| k).collect();
    assert_eq!(keys, vec!["chat_conversations", "chat_personas", "ui_theme"]);
}

#[test]
fn snapshot_remove_drops_empty_category() {
    let mut snap = Snapshot::new();
    snap.insert(Category::Settings, "ui_theme", json!("dark"));
    assert_eq!(snap.remove(Category::Settings, "ui_theme"), Some(json!("dark")));
    assert!(snap.is_empty());
    assert_eq!(snap.categories().count(), 0);
}

#[test]
fn snapshot_wire_form_uses_category_names() {
    let mut snap = Snapshot::new();
    snap.insert(Category::OcrCache, "ocr_cache_1", json!({"text": "x"}));
    let data = snap.to_data();
    assert_eq!(data["ocr-cache"]["ocr_cache_1"], json!({"text": "x"}));
    assert_eq!(serde_json::to_value(&snap).unwrap(), serde_json::to_value(&data).unwrap());
}
