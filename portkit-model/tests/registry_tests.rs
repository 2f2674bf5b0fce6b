use portkit_model::{Category, DataTypeDescriptor, DataTypeRegistry, MergeStrategy, ModelError, RecordShape};
use pretty_assertions::assert_eq;

// ── Builtin catalog ──────────────────────────────────────────────

#[test]
fn builtin_catalog_passes_validation() {
    let builtin = DataTypeRegistry::builtin();
    assert!(DataTypeRegistry::new(builtin.descriptors().to_vec()).is_ok());
}

#[test]
fn builtin_has_structured_shapes() {
    let reg = DataTypeRegistry::builtin();
    assert_eq!(reg.require("chat_conversations").unwrap().shape, RecordShape::ConversationList);
    assert_eq!(reg.require("chat_personas").unwrap().shape, RecordShape::PersonaMap);
    assert_eq!(reg.require("prompt_templates").unwrap().shape, RecordShape::TemplateList);
}

#[test]
fn private_types_are_not_exportable() {
    let reg = DataTypeRegistry::builtin();
    assert!(!reg.require("auth_session").unwrap().exportable);
    assert!(reg.exportable().all(|d| d.key != "auth_session"));
}

// ── Key resolution ───────────────────────────────────────────────

#[test]
fn exact_key_resolves() {
    let reg = DataTypeRegistry::builtin();
    let d = reg.descriptor_for_key("ui_theme").unwrap();
    assert_eq!(d.category, Category::Settings);
    assert!(!d.is_prefix);
}

#[test]
fn prefix_family_member_resolves() {
    let reg = DataTypeRegistry::builtin();
    let d = reg.descriptor_for_key("ocr_cache_9f3a").unwrap();
    assert_eq!(d.key, "ocr_cache_");
    assert_eq!(reg.category_of("ocr_cache_9f3a"), Some(Category::OcrCache));
}

#[test]
fn single_key_is_not_a_prefix() {
    let reg = DataTypeRegistry::builtin();
    assert!(reg.descriptor_for_key("ui_theme_backup").is_none());
}

#[test]
fn unregistered_keys_are_invisible() {
    let reg = DataTypeRegistry::builtin();
    assert!(reg.descriptor_for_key("some_private_key").is_none());
    assert!(reg.get("some_private_key").is_none());
    assert!(matches!(reg.require("nope"), Err(ModelError::UnknownType(_))));
}

#[test]
fn type_keys_by_category() {
    let reg = DataTypeRegistry::builtin();
    assert_eq!(
        reg.type_keys_in(&[Category::OcrCache, Category::CrawlCache]),
        vec!["ocr_cache_".to_string(), "crawl_cache_".to_string()]
    );
}

#[test]
fn categories_are_sorted_and_unique() {
    let reg = DataTypeRegistry::builtin();
    let cats = reg.categories();
    let mut sorted = cats.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(cats, sorted);
    assert!(cats.contains(&Category::DrawingMarker));
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn duplicate_keys_rejected() {
    let result = DataTypeRegistry::new(vec![
        DataTypeDescriptor::single("a", "A", Category::Chat),
        DataTypeDescriptor::single("a", "A again", Category::Settings),
    ]);
    assert!(matches!(result, Err(ModelError::DuplicateKey(k)) if k == "a"));
}

#[test]
fn key_shadowed_by_prefix_rejected() {
    let result = DataTypeRegistry::new(vec![
        DataTypeDescriptor::family("cache_", "Cache", Category::OcrCache),
        DataTypeDescriptor::single("cache_index", "Index", Category::Settings),
    ]);
    assert!(matches!(result, Err(ModelError::Shadowed { .. })));
}

#[test]
fn nested_prefixes_rejected() {
    let result = DataTypeRegistry::new(vec![
        DataTypeDescriptor::family("ocr_", "OCR", Category::OcrCache),
        DataTypeDescriptor::family("ocr_cache_", "OCR cache", Category::OcrCache),
    ]);
    assert!(result.is_err());
}

#[test]
fn unrelated_prefix_and_key_accepted() {
    let reg = DataTypeRegistry::new(vec![
        DataTypeDescriptor::family("patent_cache_", "Patents", Category::PatentCache),
        DataTypeDescriptor::single("patent_search_history", "History", Category::PatentCache),
    ])
    .unwrap();
    assert_eq!(reg.descriptors().len(), 2);
}

// ── Category / strategy names ────────────────────────────────────

#[test]
fn category_names_roundtrip() {
    for cat in Category::ALL {
        assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        assert_eq!(serde_json::to_value(cat).unwrap(), serde_json::json!(cat.as_str()));
    }
}

#[test]
fn category_order_matches_name_order() {
    let mut names: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    names.sort();
    let ordered: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    assert_eq!(names, ordered);
}

#[test]
fn server_caches() {
    assert!(Category::OcrCache.is_server_cache());
    assert!(Category::CrawlCache.is_server_cache());
    assert!(Category::PatentCache.is_server_cache());
    assert!(!Category::Chat.is_server_cache());
}

#[test]
fn strategy_parsing_accepts_dashes_and_case() {
    assert_eq!("smart".parse::<MergeStrategy>().unwrap(), MergeStrategy::Smart);
    assert_eq!("keep-local".parse::<MergeStrategy>().unwrap(), MergeStrategy::KeepLocal);
    assert_eq!("KEEP_IMPORT".parse::<MergeStrategy>().unwrap(), MergeStrategy::KeepImport);
    assert_eq!("add_new".parse::<MergeStrategy>().unwrap(), MergeStrategy::AddNew);
    assert!("overwrite".parse::<MergeStrategy>().is_err());
    assert_eq!(MergeStrategy::default(), MergeStrategy::Smart);
}

#[test]
fn descriptor_serializes_camel_case() {
    let d = DataTypeDescriptor::family("ocr_cache_", "OCR", Category::OcrCache).timestamped();
    let v = serde_json::to_value(&d).unwrap();
    assert_eq!(v["displayName"], "OCR");
    assert_eq!(v["isPrefix"], true);
    assert_eq!(v["hasTimestamp"], true);
    assert_eq!(v["category"], "ocr-cache");
}
