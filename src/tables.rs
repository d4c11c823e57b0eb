use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cell::{CellValue, Record};
use crate::downloader::{Column, Download, download_csv};
use crate::sorter::{SortState, sort_by_state};

/// Admin report pages that offer sorting and CSV export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTable {
    Rentals,
    Returns,
    BatterySwaps,
    Analytics,
}

impl ReportTable {
    pub const ALL: [ReportTable; 4] = [
        ReportTable::Rentals,
        ReportTable::Returns,
        ReportTable::BatterySwaps,
        ReportTable::Analytics,
    ];

    /// URL and filename form of the table name
    pub fn slug(self) -> &'static str {
        match self {
            ReportTable::Rentals => "rentals",
            ReportTable::Returns => "returns",
            ReportTable::BatterySwaps => "battery-swaps",
            ReportTable::Analytics => "analytics",
        }
    }

    /// Column layout of the table, in display order
    ///
    /// Keys are backend field names (nested objects flattened with dots), so a
    /// [`SortState`] built from a header click can be applied to raw rows.
    pub fn columns(self) -> Vec<Column<Record>> {
        match self {
            ReportTable::Rentals => vec![
                Column::new("id", "Rental ID"),
                Column::new("rider.name", "Rider"),
                Column::new("rider.phone", "Phone"),
                Column::new("bike_id", "Bike"),
                Column::new("start_time", "Start Time"),
                Column::new("end_time", "End Time"),
                Column::new("status", "Status"),
                currency_column("total_amount", "Total"),
            ],
            ReportTable::Returns => vec![
                Column::new("id", "Return ID"),
                Column::new("rental_id", "Rental ID"),
                Column::new("rider.name", "Rider"),
                Column::new("bike_id", "Bike"),
                Column::new("returned_at", "Returned At"),
                Column::new("condition", "Condition"),
                currency_column("damage_charge", "Damage Charge"),
                currency_column("total_amount", "Total"),
            ],
            ReportTable::BatterySwaps => vec![
                Column::new("id", "Swap ID"),
                Column::new("bike_id", "Bike"),
                Column::new("old_battery_id", "Removed Battery"),
                Column::new("new_battery_id", "Installed Battery"),
                Column::new("swapped_at", "Swapped At"),
                Column::new("station", "Station"),
                Column::new("swapped_by", "Operator"),
            ],
            ReportTable::Analytics => vec![
                Column::new("date", "Date"),
                Column::new("rentals", "Rentals"),
                Column::new("returns", "Returns"),
                Column::new("battery_swaps", "Battery Swaps"),
                Column::new("active_riders", "Active Riders"),
                currency_column("revenue", "Revenue"),
            ],
        }
    }

    /// Suggested download name, e.g. `rentals-2024-01-31.csv`
    pub fn export_filename(self, date: NaiveDate) -> String {
        format!("{}-{}.csv", self.slug(), date.format("%Y-%m-%d"))
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ReportTable::ALL
            .into_iter()
            .find(|table| table.slug() == wanted)
            .ok_or_else(|| format!("Unknown report table: {}", s))
    }
}

fn currency_column(key: &str, header: &str) -> Column<Record> {
    let field = key.to_string();
    Column::computed(key, header, move |row: &Record| {
        match row.get(&field) {
            None | Some(CellValue::Null) => CellValue::Null,
            Some(value) => match amount_of(value) {
                Some(amount) => CellValue::Text(format_inr(amount)),
                None => value.clone(),
            },
        }
    })
}

fn amount_of(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Format an amount in rupees with Indian digit grouping
///
/// # Examples
/// ```
/// use rental_admin::tables::format_inr;
///
/// assert_eq!(format_inr(123456.5), "₹1,23,456.50");
/// assert_eq!(format_inr(-999.0), "-₹999.00");
/// ```
pub fn format_inr(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if whole.len() <= 3 {
        whole.to_string()
    } else {
        let (head, last_three) = whole.split_at(whole.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{}", groups.join(","), last_three)
    };

    // Rounds to zero: no minus sign
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}₹{}.{}", sign, grouped, fraction)
}

/// Export a report exactly as it is displayed
///
/// Rows are ordered by `state` first, then written with the table's columns.
pub fn export_report(
    table: ReportTable,
    rows: &[Record],
    state: &SortState,
    date: NaiveDate,
) -> Download {
    let sorted = sort_by_state(rows, state);
    log::info!(
        "exporting {} report: {} rows sorted by {:?} {}",
        table,
        sorted.len(),
        state.key,
        state.direction
    );
    download_csv(&table.export_filename(date), &table.columns(), &sorted)
}
