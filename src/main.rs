#![cfg(not(tarpaulin_include))]

use rental_admin::config::{self, AppConfig};
use rental_admin::downloader::download_csv;
use rental_admin::loader::records_from_path;
use rental_admin::sorter::{SortDirection, SortState, sort_by_state};
use rental_admin::tables::{ReportTable, export_report};
use std::env;
use std::path::Path;

/// Offline export of a JSON snapshot to CSV
///
/// Usage: `rental-export <input.json> <table|auto> [sort_key] [asc|desc]`
///
/// With a report table name the table's column layout is used; with `auto`
/// the columns are taken from the rows themselves. The file is written to
/// `RENTAL_ADMIN_DATA_DIR` (default: current directory).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_logging();
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args.len() > 5 {
        eprintln!(
            "Usage: {} <input.json> <table|auto> [sort_key] [asc|desc]",
            args.first().map_or("rental-export", String::as_str)
        );
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    let input = Path::new(&args[1]);
    let rows = records_from_path(input)?;

    let direction = match args.get(4) {
        Some(raw) => raw.parse::<SortDirection>()?,
        None => SortDirection::Asc,
    };
    let state = match args.get(3) {
        Some(key) => SortState::new(key.as_str(), direction),
        None => SortState::default(),
    };

    let download = if args[2] == "auto" {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("export");
        let sorted = sort_by_state(&rows, &state);
        download_csv(&format!("{}.csv", stem), &[], &sorted)
    } else {
        let table: ReportTable = args[2].parse()?;
        let today = chrono::Local::now().date_naive();
        export_report(table, &rows, &state, today)
    };

    let path = download.save_to(&config.data_dir)?;
    println!("Exported {} rows to {}", rows.len(), path.display());

    Ok(())
}
