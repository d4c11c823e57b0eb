use chrono::{TimeZone, Utc};
use rental_admin::cell::{CellValue, Record, Row};
use rental_admin::sorter::{
    SortDirection, SortOptions, SortState, compare_values, sort_by_state, sort_rows, toggle_sort,
};
use std::cmp::Ordering;

// Helper to pull one field out of every row as display text
fn column(rows: &[Record], key: &str) -> Vec<String> {
    rows.iter()
        .map(|r| r.get(key).map(CellValue::to_display_string).unwrap_or_default())
        .collect()
}

fn ids(rows: &[Record]) -> Vec<String> {
    column(rows, "id")
}

fn rentals() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", "R-3")
            .with("start_time", "2024-02-01T09:00:00Z")
            .with("total_amount", 450),
        Record::new()
            .with("id", "R-1")
            .with("start_time", "2024-01-15 18:30:00")
            .with("total_amount", "1200.50"),
        Record::new()
            .with("id", "R-2")
            .with("start_time", CellValue::Null)
            .with("total_amount", 80.0),
        Record::new()
            .with("id", "R-10")
            .with("start_time", "2024-03-10")
            .with("total_amount", CellValue::Null),
    ]
}

// Test that numeric-looking identifiers order naturally
#[test]
fn test_numeric_string_ordering() {
    let rows: Vec<Record> = ["item2", "item10", "item1"]
        .iter()
        .map(|v| Record::new().with("id", *v))
        .collect();

    let sorted = sort_rows(&rows, &SortOptions::by_key("id", SortDirection::Asc));
    assert_eq!(ids(&sorted), vec!["item1", "item2", "item10"]);
}

#[test]
fn test_accented_names_sort_with_base_letters() {
    let rows: Vec<Record> = ["Farah", "Émile", "Dev", "~guest", "Zoë", "zoe"]
        .iter()
        .map(|v| Record::new().with("rider", *v))
        .collect();

    let sorted = sort_rows(&rows, &SortOptions::by_key("rider", SortDirection::Asc));
    assert_eq!(
        column(&sorted, "rider"),
        vec!["~guest", "Dev", "Émile", "Farah", "zoe", "Zoë"]
    );
}

#[test]
fn test_sort_by_date_strings_descending() {
    let sorted = sort_by_state(&rentals(), &SortState::new("start_time", SortDirection::Desc));
    // R-2 has no start time and stays last
    assert_eq!(ids(&sorted), vec!["R-10", "R-3", "R-1", "R-2"]);
}

#[test]
fn test_sort_by_mixed_numeric_types() {
    let sorted = sort_by_state(&rentals(), &SortState::new("total_amount", SortDirection::Asc));
    assert_eq!(ids(&sorted), vec!["R-2", "R-3", "R-1", "R-10"]);

    let sorted = sort_by_state(&rentals(), &SortState::new("total_amount", SortDirection::Desc));
    assert_eq!(ids(&sorted), vec!["R-1", "R-3", "R-2", "R-10"]);
}

#[test]
fn test_nulls_last_in_both_directions() {
    let rows = vec![
        Record::new().with("id", "a"),
        Record::new().with("id", "b").with("v", 2),
        Record::new().with("id", "c").with("v", CellValue::Null),
        Record::new().with("id", "d").with("v", 1),
    ];

    let asc = sort_rows(&rows, &SortOptions::by_key("v", SortDirection::Asc));
    assert_eq!(ids(&asc), vec!["d", "b", "a", "c"]);

    let desc = sort_rows(&rows, &SortOptions::by_key("v", SortDirection::Desc));
    assert_eq!(ids(&desc), vec!["b", "d", "a", "c"]);
}

#[test]
fn test_equal_rows_keep_input_order() {
    let rows = vec![
        Record::new().with("id", "first").with("status", "Active"),
        Record::new().with("id", "second").with("status", "closed"),
        Record::new().with("id", "third").with("status", "active"),
        Record::new().with("id", "fourth").with("status", " ACTIVE "),
    ];

    let asc = sort_rows(&rows, &SortOptions::by_key("status", SortDirection::Asc));
    assert_eq!(ids(&asc), vec!["first", "third", "fourth", "second"]);

    let desc = sort_rows(&rows, &SortOptions::by_key("status", SortDirection::Desc));
    assert_eq!(ids(&desc), vec!["second", "first", "third", "fourth"]);
}

#[test]
fn test_no_key_is_identity() {
    let rows = rentals();
    let unsorted = sort_rows(
        &rows,
        &SortOptions {
            key: None,
            direction: SortDirection::Desc,
            get_value: None,
        },
    );
    assert_eq!(unsorted, rows);
    assert_eq!(sort_by_state(&rows, &SortState::default()), rows);
}

#[test]
fn test_input_is_untouched() {
    let rows = rentals();
    let before = rows.clone();
    let _ = sort_by_state(&rows, &SortState::new("id", SortDirection::Desc));
    assert_eq!(rows, before);
}

#[test]
fn test_getter_overrides_key() {
    let rows = vec![
        Record::new().with("id", "x").with("first", "Zoya").with("last", "Abbas"),
        Record::new().with("id", "y").with("first", "Arjun").with("last", "Rao"),
    ];
    let by_last = |row: &Record| row.get("last").cloned().unwrap_or_default();
    let options = SortOptions {
        key: Some("first"),
        direction: SortDirection::Asc,
        get_value: Some(&by_last),
    };
    assert_eq!(ids(&sort_rows(&rows, &options)), vec!["x", "y"]);

    let by_first_only = SortOptions::by_key("first", SortDirection::Asc);
    assert_eq!(ids(&sort_rows(&rows, &by_first_only)), vec!["y", "x"]);
}

#[test]
fn test_booleans_and_instants() {
    let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let rows = vec![
        Record::new().with("id", "late").with("at", late).with("ok", true),
        Record::new().with("id", "early").with("at", early).with("ok", false),
        Record::new().with("id", "text").with("at", "2024-03-01").with("ok", 0),
    ];

    let by_time = sort_rows(&rows, &SortOptions::by_key("at", SortDirection::Asc));
    assert_eq!(ids(&by_time), vec!["early", "text", "late"]);

    let by_flag = sort_rows(&rows, &SortOptions::by_key("ok", SortDirection::Desc));
    assert_eq!(ids(&by_flag), vec!["late", "early", "text"]);
}

#[test]
fn test_compare_values_rules() {
    assert_eq!(compare_values(&"10".into(), &"9".into()), Ordering::Greater);
    assert_eq!(compare_values(&"Bike-2".into(), &"bike-2".into()), Ordering::Equal);
    assert_eq!(compare_values(&CellValue::Bool(true), &CellValue::Number(1.0)), Ordering::Equal);
    assert_eq!(
        compare_values(&CellValue::Number(f64::NAN), &CellValue::Number(0.0)),
        Ordering::Equal
    );
    assert_eq!(compare_values(&"".into(), &CellValue::Null), Ordering::Less);
}

// Test the header-click state machine
#[test]
fn test_toggle_cycle() {
    let a_asc = SortState::new("a", SortDirection::Asc);
    let a_desc = toggle_sort(&a_asc, "a");
    assert_eq!(a_desc, SortState::new("a", SortDirection::Desc));
    assert_eq!(toggle_sort(&a_desc, "a"), a_asc);
    assert_eq!(toggle_sort(&a_desc, "b"), SortState::new("b", SortDirection::Asc));
}

#[test]
fn test_sort_state_json_shape() {
    let state: SortState = serde_json::from_str(r#"{"key":"start_time","direction":"desc"}"#).unwrap();
    assert_eq!(state, SortState::new("start_time", SortDirection::Desc));

    let empty: SortState = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, SortState::default());
    assert_eq!(
        serde_json::to_string(&SortState::new("id", SortDirection::Asc)).unwrap(),
        r#"{"key":"id","direction":"asc"}"#
    );
}

// Typed rows work as long as they implement Row
#[derive(Clone, Debug, PartialEq)]
struct Swap {
    id: CellValue,
    station: CellValue,
}

impl Row for Swap {
    fn cell(&self, key: &str) -> Option<&CellValue> {
        match key {
            "id" => Some(&self.id),
            "station" => Some(&self.station),
            _ => None,
        }
    }

    fn keys(&self) -> Vec<&str> {
        vec!["id", "station"]
    }
}

#[test]
fn test_typed_rows() {
    let swaps = vec![
        Swap { id: "S-2".into(), station: "Indiranagar".into() },
        Swap { id: "S-1".into(), station: "HSR Layout".into() },
    ];
    let sorted = sort_rows(&swaps, &SortOptions::by_key("station", SortDirection::Asc));
    assert_eq!(sorted[0].id, CellValue::from("S-1"));
}
