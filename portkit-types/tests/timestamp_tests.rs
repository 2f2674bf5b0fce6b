use portkit_types::RecordTimestamp;
use serde_json::json;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn zero_is_default() {
    assert_eq!(RecordTimestamp::default(), RecordTimestamp::ZERO);
    assert!(RecordTimestamp::ZERO.is_zero());
}

#[test]
fn now_is_positive() {
    assert!(RecordTimestamp::now().millis() > 0);
}

#[test]
fn ordering_follows_millis() {
    assert!(RecordTimestamp::from_millis(100) < RecordTimestamp::from_millis(200));
    assert!(RecordTimestamp::ZERO < RecordTimestamp::from_millis(1));
}

// ── JSON scalars ─────────────────────────────────────────────────

#[test]
fn integer_is_epoch_millis() {
    assert_eq!(RecordTimestamp::from_json(&json!(1_700_000_000_000i64)).unwrap().millis(), 1_700_000_000_000);
}

#[test]
fn float_is_truncated() {
    assert_eq!(RecordTimestamp::from_json(&json!(1234.9)).unwrap().millis(), 1234);
}

#[test]
fn zero_and_negative_numbers_are_ignored() {
    assert!(RecordTimestamp::from_json(&json!(0)).is_none());
    assert!(RecordTimestamp::from_json(&json!(-5)).is_none());
}

#[test]
fn rfc3339_string() {
    let ts = RecordTimestamp::from_json(&json!("2024-01-02T03:04:05.006Z")).unwrap();
    assert_eq!(ts.millis(), 1_704_164_645_006);
}

#[test]
fn rfc3339_with_offset() {
    let a = RecordTimestamp::parse("2024-01-02T05:04:05+02:00").unwrap();
    let b = RecordTimestamp::parse("2024-01-02T03:04:05Z").unwrap();
    assert_eq!(a, b);
}

#[test]
fn space_separated_datetime() {
    let ts = RecordTimestamp::parse("2024-01-02 03:04:05").unwrap();
    assert_eq!(ts.millis(), 1_704_164_645_000);
}

#[test]
fn date_only() {
    let ts = RecordTimestamp::parse("2024-01-02").unwrap();
    assert_eq!(ts.millis(), 1_704_153_600_000);
}

#[test]
fn numeric_string() {
    assert_eq!(RecordTimestamp::parse("12345").unwrap().millis(), 12345);
}

#[test]
fn garbage_strings_are_ignored() {
    assert!(RecordTimestamp::parse("yesterday").is_none());
    assert!(RecordTimestamp::parse("").is_none());
    assert!(RecordTimestamp::from_json(&json!(true)).is_none());
    assert!(RecordTimestamp::from_json(&json!(null)).is_none());
}

#[test]
fn rfc3339_rendering() {
    let ts = RecordTimestamp::from_millis(1_704_164_645_006);
    assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05.006Z");
}
