//! Tests for importer.rs: validation pipeline, warnings, preview and commit.

use portkit_model::{Category, DataTypeRegistry};
use portkit_storage::MemoryStorage;
use portkit_sync::{
    CacheManager, DataScope, ExportPreset, ExportScope, Exporter, ImportError, ImportOptions,
    ImportProgress, ImportStage, ImportWarning, Importer, MergeStrategy, PortabilityConfig,
    SyncError,
};
use portkit_types::OwnerId;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn cache_for(owner: &str) -> (CacheManager, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let mut cache = CacheManager::new(Arc::new(DataTypeRegistry::builtin()), storage.clone());
    cache.initialize(OwnerId::new(owner).unwrap());
    (cache, storage)
}

fn seed(cache: &CacheManager) {
    cache
        .set("chat_conversations", &json!([{"id": "c1", "title": "Hello", "lastUpdate": 1000}]))
        .unwrap();
    cache
        .set("chat_personas", &json!({"p1": {"name": "Mine", "isCustom": true, "updatedAt": 10}}))
        .unwrap();
    cache.set("ui_theme", &json!("dark")).unwrap();
    cache.set("ocr_cache_page1", &json!({"text": "scan", "timestamp": 5})).unwrap();
}

fn export_text(cache: &CacheManager) -> String {
    let config = PortabilityConfig::default();
    let scope = ExportScope::preset(ExportPreset::All, cache.registry());
    Exporter::new(cache, &config)
        .build_package(&scope)
        .unwrap()
        .to_json_pretty()
        .unwrap()
}

fn envelope(version: &str, username: &str, data: Value) -> String {
    json!({
        "version": version,
        "exportTime": "2024-01-01T00:00:00.000Z",
        "exportTimestamp": 1704067200000_i64,
        "username": username,
        "data": data,
    })
    .to_string()
}

fn import_error(result: Result<impl std::fmt::Debug, SyncError>) -> ImportError {
    match result {
        Err(SyncError::Import(e)) => e,
        other => panic!("expected import error, got {other:?}"),
    }
}

#[derive(Default)]
struct Stages(Mutex<Vec<ImportStage>>);

impl ImportProgress for Stages {
    fn on_stage(&self, stage: ImportStage) {
        self.0.lock().unwrap().push(stage);
    }
}

// ── Round trip ──────────────────────────────────────────────────

#[test]
fn keep_import_into_empty_store_reproduces_export() {
    let (alice, _) = cache_for("alice");
    seed(&alice);
    let text = export_text(&alice);

    let (bob, _) = cache_for("bob");
    let config = PortabilityConfig::default();
    let report = Importer::new(&bob, &config)
        .import_str(&text, &ImportOptions::with_strategy(MergeStrategy::KeepImport))
        .unwrap();

    assert_eq!(report.merge.added, 4);
    assert_eq!(report.commit.saved, 4);
    assert_eq!(report.commit.failed, 0);
    assert!(report.checksum_valid());
    assert!(report.owner_mismatch());

    let everything = DataScope::everything();
    assert_eq!(
        bob.collect_all_data(&everything).unwrap().snapshot,
        alice.collect_all_data(&everything).unwrap().snapshot
    );
}

#[test]
fn restoring_own_export_after_clear_has_no_warnings() {
    let (cache, _) = cache_for("alice");
    seed(&cache);
    let text = export_text(&cache);
    cache.clear_all_data().unwrap();

    let config = PortabilityConfig::default();
    let report = Importer::new(&cache, &config)
        .import_str(&text, &ImportOptions::default())
        .unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.strategy, MergeStrategy::Smart);
    assert_eq!(cache.get("ui_theme").unwrap(), Some(json!("dark")));
}

#[test]
fn reimporting_same_file_is_a_noop() {
    let (cache, _) = cache_for("alice");
    seed(&cache);
    let text = export_text(&cache);
    let config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);

    let report = importer.import_str(&text, &ImportOptions::default()).unwrap();
    assert_eq!(report.merge.added + report.merge.updated, 0);
    assert!(report.diff.is_noop());
}

// ── Hard validation failures ────────────────────────────────────

#[test]
fn unsupported_version_is_rejected_before_any_write() {
    let (cache, storage) = cache_for("alice");
    cache.set("ui_theme", &json!("dark")).unwrap();
    let text = envelope("9.9", "alice", json!({"settings": {"ui_theme": "light"}}));

    let config = PortabilityConfig::default();
    let err = import_error(Importer::new(&cache, &config).import_str(&text, &ImportOptions::default()));
    assert_eq!(err, ImportError::UnsupportedVersion("9.9".into()));
    assert_eq!(cache.get("ui_theme").unwrap(), Some(json!("dark")));
    assert_eq!(storage.len("alice"), 1);
}

#[test]
fn missing_fields_are_named() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);
    let options = ImportOptions::default();

    let no_version = json!({"username": "alice", "data": {"settings": {"ui_theme": 1}}}).to_string();
    assert_eq!(
        import_error(importer.import_str(&no_version, &options)),
        ImportError::MissingField("version")
    );

    let no_owner = envelope("1.0", "", json!({"settings": {"ui_theme": 1}}));
    assert_eq!(
        import_error(importer.import_str(&no_owner, &options)),
        ImportError::MissingField("username")
    );
}

#[test]
fn empty_data_is_rejected() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);
    let options = ImportOptions::default();

    for data in [json!({}), json!({"settings": {}})] {
        let text = envelope("1.0", "alice", data);
        assert_eq!(import_error(importer.import_str(&text, &options)), ImportError::EmptyData);
    }
    let no_data = json!({"version": "1.0", "username": "alice"}).to_string();
    assert_eq!(import_error(importer.import_str(&no_data, &options)), ImportError::EmptyData);
}

#[test]
fn unparsable_text_is_malformed() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);

    for text in ["{oops", "[1, 2]", "\"just a string\"", r#"{"version": 1}"#] {
        assert!(matches!(
            import_error(importer.import_str(text, &ImportOptions::default())),
            ImportError::Malformed(_)
        ));
    }
}

#[test]
fn import_requires_bound_account() {
    let cache = CacheManager::new(Arc::new(DataTypeRegistry::builtin()), Arc::new(MemoryStorage::new()));
    let config = PortabilityConfig::default();
    let text = envelope("1.0", "alice", json!({"settings": {"ui_theme": 1}}));
    assert!(matches!(
        Importer::new(&cache, &config).import_str(&text, &ImportOptions::default()),
        Err(SyncError::NotInitialized)
    ));
}

#[test]
fn file_checks_run_on_name_and_size() {
    let (cache, _) = cache_for("alice");
    let mut config = PortabilityConfig::default();
    config.max_import_bytes = 100;
    let importer = Importer::new(&cache, &config);

    assert!(importer.validate_file("backup.JSON", 100).is_ok());
    assert!(matches!(
        importer.validate_file("backup.txt", 10),
        Err(ImportError::UnsupportedExtension { .. })
    ));
    assert!(matches!(
        importer.validate_file("backup", 10),
        Err(ImportError::UnsupportedExtension { .. })
    ));
    assert_eq!(
        importer.validate_file("backup.json", 101),
        Err(ImportError::FileTooLarge { size: 101, limit: 100 })
    );
}

#[test]
fn odd_metadata_never_blocks_an_import() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);

    let metadata = [
        json!({"totalItems": 1, "categories": {"settings": {"items": 1, "size": 10}}}),
        json!({"categories": {"settings": {}}}),
        json!({"totalItems": "one"}),
        json!("n/a"),
    ];
    for (i, metadata) in metadata.into_iter().enumerate() {
        let text = json!({
            "version": "1.0",
            "exportTime": "2024-01-01T00:00:00.000Z",
            "username": "alice",
            "data": {"settings": {"ui_theme": format!("theme-{i}")}},
            "metadata": metadata,
        })
        .to_string();

        let report = importer
            .import_str(&text, &ImportOptions::with_strategy(MergeStrategy::KeepImport))
            .unwrap();
        assert_eq!(report.commit.saved, 1);
        assert_eq!(cache.get("ui_theme").unwrap(), Some(json!(format!("theme-{i}"))));
    }
}

// ── Soft warnings ───────────────────────────────────────────────

#[test]
fn tampered_data_warns_but_imports() {
    let (alice, _) = cache_for("alice");
    seed(&alice);
    let mut package: Value = serde_json::from_str(&export_text(&alice)).unwrap();
    package["data"]["settings"]["ui_theme"] = json!("tampered");
    let text = package.to_string();

    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let report = Importer::new(&cache, &config)
        .import_str(&text, &ImportOptions::default())
        .unwrap();

    assert!(!report.checksum_valid());
    assert!(matches!(report.warnings[0], ImportWarning::ChecksumMismatch { .. }));
    assert_eq!(cache.get("ui_theme").unwrap(), Some(json!("tampered")));
}

#[test]
fn missing_checksum_and_foreign_owner_are_reported() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let text = envelope("1.0", "mallory", json!({"settings": {"ui_theme": "dark"}}));

    let report = Importer::new(&cache, &config)
        .import_str(&text, &ImportOptions::default())
        .unwrap();
    assert_eq!(
        report.warnings,
        vec![
            ImportWarning::MissingChecksum,
            ImportWarning::OwnerMismatch {
                current: "alice".into(),
                exported_by: "mallory".into()
            },
        ]
    );
    assert_eq!(report.exported_by, "mallory");
}

// ── Filtering ───────────────────────────────────────────────────

#[test]
fn unregistered_and_private_keys_are_ignored() {
    let (cache, storage) = cache_for("alice");
    let config = PortabilityConfig::default();
    let text = envelope(
        "1.0",
        "alice",
        json!({
            "settings": {"ui_theme": "dark", "auth_session": "token", "mystery": 1},
            "bogus-category": {"other": 2}
        }),
    );

    let report = Importer::new(&cache, &config)
        .import_str(&text, &ImportOptions::default())
        .unwrap();
    let mut ignored = report.ignored_keys.clone();
    ignored.sort();
    assert_eq!(ignored, vec!["auth_session", "mystery", "other"]);
    assert_eq!(report.commit.saved, 1);
    assert_eq!(storage.len("alice"), 1);
}

#[test]
fn records_are_filed_under_their_registered_category() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let text = envelope("1.0", "alice", json!({"settings": {"ocr_cache_p9": {"text": "x"}}}));

    let report = Importer::new(&cache, &config)
        .import_str(&text, &ImportOptions::default())
        .unwrap();
    assert_eq!(report.details[0].category, Category::OcrCache);
    assert!(cache.has("ocr_cache_p9").unwrap());
}

#[test]
fn import_scope_limits_both_sides() {
    let (cache, _) = cache_for("alice");
    cache.set("prompt_favorites", &json!(["local"])).unwrap();
    let config = PortabilityConfig::default();
    let text = envelope(
        "1.0",
        "alice",
        json!({"settings": {"ui_theme": "light"}, "prompt": {"prompt_favorites": ["imported"]}}),
    );
    let options = ImportOptions {
        strategy: MergeStrategy::KeepImport,
        scope: DataScope::only(["ui_theme"]),
    };

    let report = Importer::new(&cache, &config).import_str(&text, &options).unwrap();
    assert_eq!(report.ignored_keys, vec!["prompt_favorites"]);
    assert_eq!(report.diff.totals.total(), 1);
    assert_eq!(cache.get("prompt_favorites").unwrap(), Some(json!(["local"])));
    assert_eq!(cache.get("ui_theme").unwrap(), Some(json!("light")));
}

// ── Preview ─────────────────────────────────────────────────────

#[test]
fn preview_reports_impact_without_writing() {
    let (cache, storage) = cache_for("alice");
    cache.set("ui_theme", &json!("dark")).unwrap();
    let config = PortabilityConfig::default();
    let text = envelope(
        "1.0",
        "bob",
        json!({"settings": {"ui_theme": "light"}, "prompt": {"prompt_favorites": ["x"]}}),
    );

    let preview = Importer::new(&cache, &config)
        .preview_str(&text, &ImportOptions::default())
        .unwrap();
    assert_eq!(preview.item_count, 2);
    assert_eq!(preview.exported_by, "bob");
    assert!(preview.owner_mismatch());
    assert_eq!(preview.diff.totals.added, 1);
    assert_eq!(preview.diff.totals.conflict, 1);

    assert_eq!(storage.len("alice"), 1);
    assert_eq!(cache.get("ui_theme").unwrap(), Some(json!("dark")));
}

// ── Progress ────────────────────────────────────────────────────

#[test]
fn import_reports_stages_in_order() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let stages = Stages::default();
    let text = envelope("1.0", "alice", json!({"settings": {"ui_theme": "dark"}}));

    Importer::new(&cache, &config)
        .with_progress(&stages)
        .import_str(&text, &ImportOptions::default())
        .unwrap();

    let seen = stages.0.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ImportStage::Parse,
            ImportStage::Validate,
            ImportStage::Diff,
            ImportStage::Merge,
            ImportStage::Save,
            ImportStage::Done,
        ]
    );
    let percents: Vec<u8> = seen.iter().map(ImportStage::percent).collect();
    assert_eq!(percents, vec![30, 40, 50, 70, 90, 100]);
}

#[test]
fn rejected_import_stops_at_validation() {
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();
    let stages = Stages::default();
    let text = envelope("2.0", "alice", json!({"settings": {"ui_theme": "dark"}}));

    let result = Importer::new(&cache, &config)
        .with_progress(&stages)
        .import_str(&text, &ImportOptions::default());
    assert!(result.is_err());
    assert_eq!(*stages.0.lock().unwrap().last().unwrap(), ImportStage::Validate);
}

// ── Files ───────────────────────────────────────────────────────

#[tokio::test]
async fn import_file_reads_exported_file() {
    let dir = tempfile::tempdir().unwrap();
    let (alice, _) = cache_for("alice");
    seed(&alice);
    let config = PortabilityConfig::default();
    let outcome = Exporter::new(&alice, &config)
        .export_to_dir(&ExportScope::default(), dir.path())
        .unwrap();

    let (bob, _) = cache_for("bob");
    let stages = Stages::default();
    let report = Importer::new(&bob, &config)
        .with_progress(&stages)
        .import_file(&outcome.path, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.commit.saved, outcome.total_items);
    assert_eq!(stages.0.lock().unwrap()[0], ImportStage::Read);
}

#[tokio::test]
async fn preview_file_rejects_wrong_extension_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let text = envelope("1.0", "alice", json!({"settings": {"ui_theme": "dark"}}));
    let txt = dir.path().join("backup.txt");
    std::fs::write(&txt, &text).unwrap();
    let json_path = dir.path().join("backup.json");
    std::fs::write(&json_path, &text).unwrap();

    let (cache, _) = cache_for("alice");
    let mut config = PortabilityConfig::default();
    let importer = Importer::new(&cache, &config);
    let err = import_error(importer.preview_file(&txt, &ImportOptions::default()).await);
    assert!(matches!(err, ImportError::UnsupportedExtension { .. }));
    assert!(importer.preview_file(&json_path, &ImportOptions::default()).await.is_ok());

    config.max_import_bytes = 8;
    let importer = Importer::new(&cache, &config);
    let err = import_error(importer.preview_file(&json_path, &ImportOptions::default()).await);
    assert!(matches!(err, ImportError::FileTooLarge { limit: 8, .. }));
}

#[tokio::test]
async fn missing_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = cache_for("alice");
    let config = PortabilityConfig::default();

    let err = import_error(
        Importer::new(&cache, &config)
            .import_file(dir.path().join("absent.json"), &ImportOptions::default())
            .await,
    );
    assert!(matches!(err, ImportError::Unreadable(_)));
}
