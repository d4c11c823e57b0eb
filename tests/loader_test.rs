use rental_admin::cell::{CellValue, Row};
use rental_admin::loader::{LoadError, records_from_json, records_from_path, records_from_str};
use serde_json::json;
use std::fs;

#[test]
fn test_bare_array_keeps_field_order() {
    let rows = records_from_str(r#"[{"zeta": 1, "alpha": "x", "mid": null}]"#).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys(), vec!["zeta", "alpha", "mid"]);
    assert_eq!(rows[0].get("mid"), Some(&CellValue::Null));
}

#[test]
fn test_data_envelope() {
    let body = json!({
        "data": [
            {"id": "BS-1", "bike": {"id": "EB-2", "model": "Urban"}, "ok": true},
            {"id": "BS-2", "bike": {"id": "EB-9"}}
        ],
        "total": 2
    });
    let rows = records_from_json(&body).unwrap();
    assert_eq!(rows[0].keys(), vec!["id", "bike.id", "bike.model", "ok"]);
    assert_eq!(rows[0].get("ok"), Some(&CellValue::Bool(true)));
    assert_eq!(rows[1].get("bike.id"), Some(&CellValue::Text("EB-9".into())));
    assert_eq!(rows[1].get("bike.model"), None);
}

#[test]
fn test_rejects_non_collections() {
    assert!(matches!(
        records_from_json(&json!({"items": []})),
        Err(LoadError::NotACollection)
    ));
    assert!(matches!(
        records_from_json(&json!("rentals")),
        Err(LoadError::NotACollection)
    ));
    assert!(matches!(
        records_from_json(&json!([{"id": 1}, 7])),
        Err(LoadError::RowNotObject { index: 1 })
    ));
    assert!(matches!(records_from_str("[{"), Err(LoadError::Json(_))));
}

#[test]
fn test_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swaps.json");
    fs::write(&path, r#"[{"id": "S-1", "swapped_at": "2024-04-02 07:30:00"}]"#).unwrap();

    let rows = records_from_path(&path).unwrap();
    assert_eq!(
        rows[0].get("swapped_at").map(CellValue::to_display_string),
        Some("2024-04-02 07:30:00".to_string())
    );

    let missing = records_from_path(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, LoadError::Io { .. }));
    assert!(missing.to_string().contains("nope.json"));
}

#[test]
fn test_record_serde_round_trip_shape() {
    let rows = records_from_str(r#"[{"id": "R-1", "total": 10.5, "paid": false}]"#).unwrap();
    let json = serde_json::to_string(&rows[0]).unwrap();
    assert_eq!(json, r#"{"id":"R-1","total":10.5,"paid":false}"#);
}
